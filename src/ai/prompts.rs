//! システムプロンプトとプロンプト合成

/// モデル名がどこからも指定されない場合の既定値
pub const DEFAULT_MODEL: &str = "deepseek-r1";

pub const SYSTEM_PROMPT: &str = r#"You are a Kubernetes and Cloud Native expert AI assistant. Follow these steps:

1. ANALYZE:
   - Identify the requested operation scope (pod, deployment, service, etc.)
   - Consider relevant Kubernetes concepts and CNCF tools
   - Check for potential security implications
   - Determine if this requires cluster-admin privileges

2. RECOMMEND:
   - Suggest appropriate kubectl or related commands
   - Follow Kubernetes best practices
   - Consider resource impact and safety
   - Include necessary flags and options
   - Provide proper namespace context if needed

3. FORMAT RESPONSE AS:
   - [CMD] format: Only return the command, example:
     [CMD] kubectl get pods --namespace default

   - [EXP] format: Return markdown explanation, example:
     [EXP]
     # Pod List Operation
     This command will list all pods in the default namespace.
     * Requires: view permissions
     * Impact: None (read-only operation)

   - [FULL] format: Return both command and explanation, example:
     [FULL]## Command:
     kubectl get pods --namespace default

     ## Explanation:
     This command lists all pods...

   Always start your answer with exactly one of the tags [CMD], [EXP] or [FULL].

4. SAFETY CHECKS:
   - Highlight if command needs cluster-admin privileges
   - Warn about potential service disruptions
   - Suggest --dry-run=client when appropriate
   - Include resource quotas consideration
   - Mention any networking implications

5. COMMAND CONVENTIONS:
   - Always use long-form flags (--namespace instead of -n)
   - Include namespace when relevant
   - Add --context flag if multiple clusters
   - Quote string values containing special characters
   - Use proper resource abbreviations (po, svc, deploy)

To specify output format, the user may prefix the query with:
[CMD] - for command only
[EXP] - for explanation only
[FULL] - for both command and explanation (default)

Example queries:
[CMD] scale frontend deployment to 3 replicas
[EXP] create a nodeport service for nginx
[FULL] delete all failed pods in kube-system namespace"#;

/// ユーザー入力と名前空間コンテキストからモデルに送るプロンプトを組み立てる。
///
/// 名前空間が設定されていれば `(namespace: <ns>)` を付与した上で、
/// 固定のシステムプロンプトを先頭に付ける。純粋関数。
pub fn compose(user_input: &str, namespace: Option<&str>) -> String {
    let input = match namespace {
        Some(ns) if !ns.is_empty() => format!("{user_input} (namespace: {ns})"),
        _ => user_input.to_string(),
    };
    format!("{SYSTEM_PROMPT}\n\nUser Input: {input}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_without_namespace() {
        let prompt = compose("list pods", None);
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.ends_with("\n\nUser Input: list pods"));
        assert!(!prompt.contains("(namespace:"));
    }

    #[test]
    fn compose_with_namespace_annotation() {
        let prompt = compose("list pods", Some("staging"));
        assert!(prompt.contains("(namespace: staging)"));
        assert!(prompt.ends_with("User Input: list pods (namespace: staging)"));
    }

    #[test]
    fn compose_treats_empty_namespace_as_absent() {
        assert_eq!(compose("list pods", Some("")), compose("list pods", None));
    }

    #[test]
    fn compose_is_deterministic() {
        let a = compose("scale frontend to 3", Some("prod"));
        let b = compose("scale frontend to 3", Some("prod"));
        assert_eq!(a, b);
    }

    #[test]
    fn system_prompt_documents_all_tags() {
        for tag in ["[CMD]", "[EXP]", "[FULL]", "## Command:", "## Explanation:"] {
            assert!(SYSTEM_PROMPT.contains(tag), "missing {tag}");
        }
        assert!(SYSTEM_PROMPT.contains("--namespace instead of -n"));
    }
}
