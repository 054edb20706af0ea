pub mod dynamodb_prompt_store;
pub mod in_memory_prompt_store;
pub mod json_recipient_list;
pub mod postmark_email_client;
pub mod trends_research_client;
