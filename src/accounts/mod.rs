//! Account use cases and their request/response shapes.

pub mod dto;
pub mod service;

pub use dto::{
    AuthResponse, PromoteResponse, RefreshRequest, SigninRequest, SignoutRequest, SignoutResponse,
    SignupRequest, WhoAmIResponse,
};
pub use service::AccountService;
