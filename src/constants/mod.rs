pub mod generation_prompt;
