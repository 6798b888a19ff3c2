use crate::RouteMode;

pub const NOT_IN_CONTEXT_ANSWER: &str =
    "I couldn't find this information in the provided documents.";

pub fn compose_prompt(mode: RouteMode, context: &str, question: &str) -> String {
    match mode {
        RouteMode::TypeDirected(_) => format!(
            "You are a helpful assistant. Describe the document content briefly.

Document Content:
{context}

Question:
{question}

Instructions:
- Provide a brief and comprehensive summary
- Be clear and informative

Answer:"
        ),
        RouteMode::Semantic => format!(
            "You are a helpful assistant. Answer the question using ONLY the provided context.

Context:
{context}

Question:
{question}

Instructions:
- Use ONLY information from the Context above
- Answer the question
- If the answer is NOT in the context, respond exactly: \"{NOT_IN_CONTEXT_ANSWER}\"

Answer:"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileCategory;

    #[test]
    fn semantic_prompt_carries_fallback_sentence() {
        let prompt = compose_prompt(RouteMode::Semantic, "pump runs at 5 bar", "what pressure?");

        assert!(prompt.contains("Answer the question using ONLY the provided context."));
        assert!(prompt.contains("Context:\npump runs at 5 bar\n"));
        assert!(prompt.contains("Question:\nwhat pressure?\n"));
        assert!(prompt.contains(
            "respond exactly: \"I couldn't find this information in the provided documents.\""
        ));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn type_directed_prompt_asks_for_summary() {
        let prompt = compose_prompt(
            RouteMode::TypeDirected(FileCategory::Csv),
            "a,b\n1,2",
            "what is in the csv?",
        );

        assert!(prompt.contains("Describe the document content briefly."));
        assert!(prompt.contains("Document Content:\na,b\n1,2\n"));
        assert!(prompt.contains("- Provide a brief and comprehensive summary"));
        assert!(!prompt.contains(NOT_IN_CONTEXT_ANSWER));
    }
}
