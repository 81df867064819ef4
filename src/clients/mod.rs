pub mod fetcher;
pub mod llm_client;
pub mod payment_client;

pub use fetcher::{DocumentFetcher, HttpDocumentFetcher};
pub use llm_client::{OpenAiReasoner, Reasoner, ReasoningPrompt, Stage};
pub use payment_client::{
    compute_input_hash, is_funds_locked, Amount, MasumiPaymentClient, PaymentGateway,
    PaymentRequest, PaymentRequestParams, FUNDS_LOCKED, PAYMENT_COMPLETED,
};
