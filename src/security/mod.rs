//! Credential handling: password hashing and signed bearer tokens.

pub mod jwt;
pub mod password;
