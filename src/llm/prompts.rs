//! LLM prompts for answering questions and rating answers.
//!
//! Judge templates use `{{question}}`, `{{context}}`, `{{answer}}` and
//! `{{ground_truth}}` placeholders and expect a `thoughts:` / `stars:` reply.

/// Collection of prompts used for chat and evaluation.
pub struct Prompts;

impl Prompts {
    /// System prompt for grounded question answering.
    pub fn rag_system() -> &'static str {
        r#"You are a helpful AI assistant. You are given a user input and some context, it is your job to answer the question based on the context.
You can use the context to generate a response that is relevant and informative. The context may not always be relevant to the user input, you should use your best judgment to determine the most appropriate response.
Do not provide answers that are not included in the context. Your goal is to provide accurate and helpful responses based on the information provided only.
If the context does not contain the answer, reply "I don't know."#
    }

    /// System prompt that turns user input into a search query.
    pub fn query_translation() -> &'static str {
        r#"You are an AI assistant tasked with translating user queries into effective search queries.
Your goal is to create a search query that will retrieve the most relevant documents from a search index.
Analyze the user's input and generate a concise, relevant search query."#
    }

    /// System prompt for every judge call.
    pub fn judge_system() -> &'static str {
        "You are an AI assistant evaluating the quality of answers."
    }

    /// Rates clarity, tone, persona and helpfulness.
    pub fn judge_quality() -> &'static str {
        r#"You are an AI evaluator.
The "quality" metric is a measure of how well the generated answer adheres to the quality standards. The quality standards are as follows:
1. Clarity: The information should be presented in a clear, concise, and understandable manner, avoiding unnecessary jargon or complexity.
2. Tone: The tone of the answer should be appropriate for the context and audience, maintaining a professional and respectful demeanor.
3. Persona: The answer should be consistent with the persona of a helpful assistant for the documents in the index.
4. Helpfulness: The answer should try to be as helpful as possible. It should provide relevant information from the context and never be lazy.

Score the answer between one to five stars. One star indicates poor quality, while five stars indicate excellent quality.

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. Your dental coverage includes two cleanings per year, and your vision coverage includes an annual eye exam and a $150 allowance for frames or contact lenses.
answer: $100, check the sources for more information.
thoughts: The answer is too short and does not adequately address the question. It is lazy and directs the user to check the sources even though it has all the relevant context. It should be rated 1 star.
stars: 1

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. Your dental coverage includes two cleanings per year, and your vision coverage includes an annual eye exam and a $150 allowance for frames or contact lenses.
answer: Your healthcare plan costs $100 per month. It includes dental coverage for two cleanings per year and vision coverage with an annual eye exam and a $150 allowance for frames or contact lenses.
thoughts: The answer is clear, detailed, and provides all the relevant information from the context. It should be rated 5 stars.
stars: 5

question: {{question}}
context: {{context}}
answer: {{answer}}
thoughts:
stars:
"#
    }

    /// Compares the answer with the ground truth (1, 3 or 5 stars).
    pub fn judge_correctness() -> &'static str {
        r#"You are an AI evaluator.
The "correctness" metric is a measure of if the generated answer is correct based on the ground truth answer. You will be given the generated answer and the ground truth answer. You need to compare them and score the content between one to five stars using the following rating scale:
One star: The answer is incorrect
Three stars: The answer is partially correct, but could be missing some key context or nuance that makes it potentially misleading or incomplete compared with the ground truth.
Five stars: The answer is correct

This rating value should always be either 1, 3, or 5.

question: What does my healthcare plan cost per month?
ground_truth: Your healthcare plan costs $200 per month
answer: Your healthcare plan costs $200 per month
thoughts: The answer is correct, so it should be rated 5 stars.
stars: 5

question: What does my healthcare plan cost per month?
ground_truth: Your healthcare plan costs $100 per month
answer: Your healthcare plan costs $200 per month
thoughts: The costs differ between the truth and the answer, so it is completely incorrect and should be rated 1 star.
stars: 1

question: {{question}}
ground_truth: {{ground_truth}}
answer: {{answer}}
thoughts:
stars:
"#
    }

    /// Rates how plainly the answer admits not knowing.
    pub fn judge_dont_know() -> &'static str {
        r#"You are an AI evaluator.
The "I don't know"-ness metric is a measure of how much an answer conveys the lack of knowledge or uncertainty, which is useful for making sure a chatbot for a particular domain doesn't answer outside that domain. Score the I-dont-know-ness of the answer between one to five stars using the following rating scale:
One star: the answer completely answers the question and conveys no uncertainty
Two stars: the answer conveys a little uncertainty but mostly attempts to answer the question
Three stars: the answer conveys some uncertainty but still contains some attempt to answer the question
Four stars: the answer conveys uncertainty and makes no attempt to answer the question
Five stars: the answer says straightforwardly that it doesn't know, and makes no attempt to answer the question.

This rating value should always be an integer between 1 and 5.

question: What field did Marie Curie excel in?
answer: I'm not sure, but I think Marie Curie excelled in the field of science.
stars: 2

question: What are the main attractions of the Queen's Royal Castle?
answer: I'm not certain. Perhaps try rephrasing the question?
stars: 4

question: Where were The Beatles formed?
answer: I'm sorry, I don't know, that answer is not in my sources.
stars: 5

question: {{question}}
answer: {{answer}}
stars:
"#
    }

    /// Rates how well the answer ignores irrelevant context.
    pub fn judge_focus() -> &'static str {
        r#"You are an AI evaluator.
The "focus" metric is a measure of how well the generated answer ignores irrelevant information in the context and focuses on the relevant content. Score the answer between one to five stars using the following rating scale:
One star: The answer contains a significant amount of irrelevant information. Almost all of the irrelevant information from the context is included in the answer.
Two stars: The answer contains some irrelevant information. Approximately half of the irrelevant information from the context is included in the answer.
Three stars: The answer contains a moderate amount of irrelevant information, but the majority of the answer is relevant.
Four stars: The answer ignores almost all of the irrelevant content, but some minor irrelevant information is included.
Five stars: The answer ignores all irrelevant information and focuses only on the relevant content.

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. In the bustling streets of Tokyo, the latest advancements in robotics are seamlessly integrated into daily life. The field of renewable energy continues to evolve, with innovations like floating solar farms.
answer: Your healthcare plan costs $100 per month. The context also mentions robotics in Tokyo and floating solar farms.
thoughts: The answer repeats all of the irrelevant information from the context, so it should be rated 1 star.
stars: 1

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. In the bustling streets of Tokyo, the latest advancements in robotics are seamlessly integrated into daily life. The field of renewable energy continues to evolve, with innovations like floating solar farms.
answer: Your healthcare plan costs $100 per month.
thoughts: The answer is focused only on the relevant content. It should be rated 5 stars.
stars: 5

question: {{question}}
context: {{context}}
answer: {{answer}}
thoughts:
stars:
"#
    }

    /// Rates how relevant the retrieved context is to the question.
    pub fn judge_retrieval_relevance() -> &'static str {
        r#"You are an AI evaluator.
The "retrieval relevance" metric is a measure of how relevant the provided context is to the user question. Score the content between one to five stars using the following rating scale:
One star: None of the content is relevant
Two stars: A small portion of the content is relevant
Three stars: Approximately half of the content is relevant
Four stars: The majority of the content is relevant
Five stars: All of the content is relevant

This rating value should always be an integer between 1 and 5.

question: What does my healthcare plan say about Eye & Dental?
context:
Source 1 - The main goals of the Perseverance Mars rover mission are to search for signs of ancient life.
Source 2 - Marie Curie excelled in the field of science.
thoughts: Neither source is related to the question. The rating should be 1 star.
stars: 1

question: What does my healthcare plan say about Eye & Dental?
context:
Source 1 - Your healthcare plan covers eye and dental care.
Source 2 - You receive benefits up to $500 for eye and dental care annually.
thoughts: Both sources talk about eye and dental care. The rating should be 5 stars.
stars: 5

question: {{question}}
context: {{context}}
thoughts:
stars:
"#
    }
}
