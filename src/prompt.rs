use crate::retrieval::RetrievedChunk;

/// Builds the model-input prompt from retrieved context and the question.
/// Pure: identical inputs produce a byte-identical string. An empty
/// retrieval renders an empty context slot; the instructional text tells the
/// model how to behave in that case.
pub fn compose_rag_prompt(chunks: &[RetrievedChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|retrieved| retrieved.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Please prioritize using the information below when responding to the user's question.\n\
         If the information is unrelated, answer normally.\n\
         If relevant, respond based on the information.\n\
         If the information is insufficient, clearly state so and do not generate incorrect details.\n\
         \n\
         \n\
         {context}\n\
         \n\
         Please respond to the user's following question based on the information above.\n\
         \n\
         {question}\n"
    )
}
