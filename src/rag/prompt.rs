//! Prompt templates for the summarizer and the QA generator.

use super::classify::DocumentType;

/// Instruction prefix placed before the document text for each document type.
pub const fn summary_instruction(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::ResearchPaper => {
            "Summarize the main objective and contribution of this research paper:\n\n"
        }
        DocumentType::EmploymentDocument => {
            "Summarize the purpose of this employment-related document:\n\n"
        }
        DocumentType::LetterOrEmail => "Summarize the key message of this letter or email:\n\n",
        DocumentType::Invoice => "Summarize what this billing document is about:\n\n",
        DocumentType::Generic => "Summarize the main topic and purpose of this document:\n\n",
    }
}

/// Summary prompt: the type-specific instruction followed by the prepared text.
pub fn build_summary_prompt(doc_type: DocumentType, text: &str) -> String {
    let instruction = summary_instruction(doc_type);
    let mut prompt = String::with_capacity(instruction.len() + text.len());
    prompt.push_str(instruction);
    prompt.push_str(text);
    prompt
}

/// Grounded QA prompt restricting the model to `context`.
pub fn build_qa_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using ONLY the context below.\n\
         If the answer is not present in the context, say \"I don't know\".\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}
