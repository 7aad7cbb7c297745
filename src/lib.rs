//! Client for the DomainNameAPI domain-registration SOAP service.
//!
//! [`DomainNameApi`] exposes one async method per remote operation:
//! registration, transfer, renewal, contact management, child nameservers,
//! WHOIS privacy, availability checks, domain listing, TLD pricing and
//! reseller account details. Credentials are embedded into every request;
//! the underlying connection is created lazily on first use and shared for
//! the client's lifetime.
//!
//! Responses are normalised into typed records where the payload matches
//! the documented shape, with a raw-payload fallback otherwise; see
//! [`ApiResult`].
//!
//! ```no_run
//! use domainnameapi::DomainNameApi;
//!
//! # async fn run() {
//! let client = DomainNameApi::new("reseller", "secret", false);
//! match client.get_details("example.com").await {
//!     domainnameapi::ApiResult::Ok(info) => println!("expires {}", info.dates.expiration),
//!     domainnameapi::ApiResult::Raw(payload) => println!("unexpected shape: {payload}"),
//!     domainnameapi::ApiResult::Err(failure) => eprintln!("{failure}"),
//! }
//! # }
//! ```

pub mod client;
pub mod response;
pub mod soap;
pub mod types;

pub use client::{DomainNameApi, RegistrationOptions, DEFAULT_NAME_SERVERS};
pub use response::{ApiFailure, ApiResult, ErrorLevel};
pub use soap::{HttpSoapTransport, SoapTransport, TransportError, SERVICE_URL};
pub use types::{
    as_list, parse_contact_info, parse_domain_info, AvailabilityInfo, BalanceEntry,
    ChildNameServer, ChildNameServerEntry, ContactInfo, ContactRoles, ContactSet, DomainInfo,
    DomainList, PrivacyProtection, Renewal, ResellerDetails, TldInfo, TransferDecision,
};
