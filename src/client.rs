//! DomainNameAPI adapter client.
//!
//! One method per remote operation. Every method builds a parameter tree
//! merging the stored credentials with its arguments, funnels it through the
//! shared invoke routine exactly once, and reshapes the normalized payload
//! into its documented return contract. Methods never return transport
//! errors and never panic; failures always surface as [`ApiResult::Err`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::response::{extract_payload, normalize, ApiFailure, ApiResult};
use crate::soap::{HttpSoapTransport, SoapTransport, TransportError, SERVICE_URL};
use crate::types::{
    as_list, parse_availability_info, parse_balance_entry, parse_contact_info, parse_domain_info,
    parse_tld_info, text, AvailabilityInfo, ChildNameServer, ContactRoles, ContactSet, DomainInfo,
    DomainList, PrivacyProtection, Renewal, ResellerDetails, TldInfo, TransferDecision,
};

/// Nameservers applied when registration is called without an explicit set.
pub const DEFAULT_NAME_SERVERS: [&str; 2] = ["dns.domainnameapi.com", "web.domainnameapi.com"];

const DEFAULT_PRIVACY_REASON: &str = "Owner request";
const DEFAULT_TLD_PAGE_SIZE: u32 = 20;

type SharedTransport = Result<Arc<dyn SoapTransport>, Arc<TransportError>>;

/// Optional settings for `RegisterWithContactInfo`. The `Default` impl
/// carries the documented defaults.
#[derive(Debug, Clone)]
pub struct RegistrationOptions {
    pub name_servers: Vec<String>,
    pub epp_lock: bool,
    pub privacy_lock: bool,
    /// Converted to `KeyValueOfstringstring` pairs when non-empty; omitted
    /// from the request entirely when empty.
    pub additional_attributes: BTreeMap<String, String>,
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self {
            name_servers: DEFAULT_NAME_SERVERS.iter().map(|s| s.to_string()).collect(),
            epp_lock: true,
            privacy_lock: false,
            additional_attributes: BTreeMap::new(),
        }
    }
}

/// Client for the DomainNameAPI domain-registration SOAP service.
///
/// Credentials are fixed at construction and embedded into every outgoing
/// request. The underlying service connection is created lazily on first
/// use and shared by all operations for the client's lifetime.
pub struct DomainNameApi {
    username: String,
    password: String,
    service_url: String,
    test_mode: bool,
    transport: OnceCell<SharedTransport>,
}

impl DomainNameApi {
    /// Create a client for the production endpoint. Never fails; connection
    /// problems surface when an operation is first invoked.
    pub fn new(username: impl Into<String>, password: impl Into<String>, test_mode: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            service_url: SERVICE_URL.to_string(),
            test_mode,
            transport: OnceCell::new(),
        }
    }

    /// Build a client over a caller-supplied transport (tests, alternative
    /// codecs).
    pub fn with_transport(
        username: impl Into<String>,
        password: impl Into<String>,
        transport: Arc<dyn SoapTransport>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            service_url: SERVICE_URL.to_string(),
            test_mode: false,
            transport: OnceCell::new_with(Some(Ok(transport))),
        }
    }

    /// Point the client at a different service description URL.
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = service_url.into();
        self
    }

    /// Reserved flag; accepted at construction but has no behavioural
    /// effect.
    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// The shared transport. Created once per client; concurrent first
    /// callers share one in-flight connection attempt, and a failed attempt
    /// stays cached for the client's lifetime.
    async fn transport(&self) -> Result<Arc<dyn SoapTransport>, ApiFailure> {
        let service_url = self.service_url.clone();
        let shared = self
            .transport
            .get_or_init(|| async move {
                match HttpSoapTransport::connect(&service_url).await {
                    Ok(transport) => Ok(Arc::new(transport) as Arc<dyn SoapTransport>),
                    Err(err) => {
                        warn!(error = %err, "connection setup failed");
                        Err(Arc::new(err))
                    }
                }
            })
            .await;

        match shared {
            Ok(transport) => Ok(Arc::clone(transport)),
            Err(_) => Err(ApiFailure::exception()),
        }
    }

    /// Invoke the remote procedure and unwrap its payload, before any
    /// normalization.
    async fn invoke_payload(&self, operation: &str, parameters: Value) -> Result<Value, ApiFailure> {
        let transport = self.transport().await?;

        let response = match transport.invoke(operation, &parameters).await {
            Ok(response) => response,
            Err(err) => {
                warn!(operation, error = %err, "remote call failed");
                return Err(ApiFailure::exception());
            }
        };

        debug!(operation, "remote call completed");
        Ok(extract_payload(operation, &response))
    }

    /// Shared invoke routine. Every operation method calls this exactly
    /// once; none retries.
    async fn call(&self, operation: &str, parameters: Value) -> Result<Value, ApiFailure> {
        let payload = self.invoke_payload(operation, parameters).await?;
        normalize(payload)
    }

    /// Wrap operation fields with the stored credentials under the
    /// service's `request` element.
    fn request(&self, mut fields: Value) -> Value {
        if let Some(map) = fields.as_object_mut() {
            map.insert("Password".to_string(), Value::String(self.password.clone()));
            map.insert("UserName".to_string(), Value::String(self.username.clone()));
        }
        json!({ "request": fields })
    }

    /// Register a child nameserver (glue record) under a domain. Echoes the
    /// input; the server response body is not re-read.
    pub async fn add_child_name_server(
        &self,
        domain_name: &str,
        name_server: &str,
        ip_address: &str,
    ) -> ApiResult<ChildNameServer> {
        let parameters = self.request(json!({
            "DomainName": domain_name,
            "ChildNameServer": name_server,
            "IpAddressList": [ip_address],
        }));

        match self.call("AddChildNameServer", parameters).await {
            Ok(_) => ApiResult::Ok(ChildNameServer {
                name_server: name_server.to_string(),
                ip_addresses: vec![ip_address.to_string()],
            }),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Replace the IP address of a child nameserver.
    pub async fn modify_child_name_server(
        &self,
        domain_name: &str,
        name_server: &str,
        ip_address: &str,
    ) -> ApiResult<ChildNameServer> {
        let parameters = self.request(json!({
            "DomainName": domain_name,
            "ChildNameServer": name_server,
            "IpAddressList": [ip_address],
        }));

        match self.call("ModifyChildNameServer", parameters).await {
            Ok(_) => ApiResult::Ok(ChildNameServer {
                name_server: name_server.to_string(),
                ip_addresses: vec![ip_address.to_string()],
            }),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Delete a child nameserver.
    pub async fn delete_child_name_server(
        &self,
        domain_name: &str,
        name_server: &str,
    ) -> ApiResult<ChildNameServer> {
        let parameters = self.request(json!({
            "DomainName": domain_name,
            "ChildNameServer": name_server,
        }));

        match self.call("DeleteChildNameServer", parameters).await {
            Ok(_) => ApiResult::Ok(ChildNameServer {
                name_server: name_server.to_string(),
                ip_addresses: Vec::new(),
            }),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Fetch the four contact records of a domain. Falls back to the raw
    /// payload when any of the four roles is missing.
    pub async fn get_contacts(&self, domain_name: &str) -> ApiResult<ContactSet> {
        let parameters = self.request(json!({ "DomainName": domain_name }));

        match self.call("GetContacts", parameters).await {
            Ok(data) => {
                let complete = ["AdministrativeContact", "TechnicalContact", "RegistrantContact", "BillingContact"]
                    .iter()
                    .all(|role| data[*role].is_object());

                if complete {
                    ApiResult::Ok(ContactSet {
                        administrative: parse_contact_info(&data["AdministrativeContact"]),
                        billing: parse_contact_info(&data["BillingContact"]),
                        registrant: parse_contact_info(&data["RegistrantContact"]),
                        technical: parse_contact_info(&data["TechnicalContact"]),
                    })
                } else {
                    ApiResult::Raw(data)
                }
            }
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Replace the four contact records of a domain.
    pub async fn save_contacts(
        &self,
        domain_name: &str,
        contacts: &ContactRoles,
    ) -> ApiResult<()> {
        let parameters = self.request(json!({
            "DomainName": domain_name,
            "AdministrativeContact": contacts.administrative,
            "BillingContact": contacts.billing,
            "TechnicalContact": contacts.technical,
            "RegistrantContact": contacts.registrant,
        }));

        match self.call("SaveContacts", parameters).await {
            Ok(data) if data["result"] == true => ApiResult::Ok(()),
            Ok(data) => ApiResult::Raw(data),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Start an inbound transfer. The transfer period travels as the
    /// `TRANSFERPERIOD` additional attribute.
    pub async fn transfer(
        &self,
        domain_name: &str,
        auth_code: &str,
        period: &str,
    ) -> ApiResult<DomainInfo> {
        let parameters = self.request(json!({
            "DomainName": domain_name,
            "AuthCode": auth_code,
            "AdditionalAttributes": {
                "KeyValueOfstringstring": [
                    { "Key": "TRANSFERPERIOD", "Value": period }
                ]
            },
        }));

        self.domain_info_result("Transfer", parameters).await
    }

    /// Cancel a pending outbound transfer.
    pub async fn cancel_transfer(&self, domain_name: &str) -> ApiResult<TransferDecision> {
        self.transfer_decision("CancelTransfer", domain_name).await
    }

    /// Approve a pending outbound transfer.
    pub async fn approve_transfer(&self, domain_name: &str) -> ApiResult<TransferDecision> {
        self.transfer_decision("ApproveTransfer", domain_name).await
    }

    /// Reject a pending outbound transfer.
    pub async fn reject_transfer(&self, domain_name: &str) -> ApiResult<TransferDecision> {
        self.transfer_decision("RejectTransfer", domain_name).await
    }

    // The decision operations trust the upstream `result` field as-is
    // instead of re-deriving it from the SUCCESS marker, so it must be read
    // before normalization injects the derived value over it.
    async fn transfer_decision(
        &self,
        operation: &str,
        domain_name: &str,
    ) -> ApiResult<TransferDecision> {
        let parameters = self.request(json!({ "DomainName": domain_name }));

        let payload = match self.invoke_payload(operation, parameters).await {
            Ok(payload) => payload,
            Err(failure) => return ApiResult::Err(failure),
        };
        let upstream = payload["result"].as_bool();

        match normalize(payload) {
            Ok(data) => ApiResult::Ok(TransferDecision {
                result: upstream.unwrap_or_else(|| data["result"].as_bool().unwrap_or(false)),
                domain_name: domain_name.to_string(),
            }),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Renew a domain for the given number of years.
    pub async fn renew(&self, domain_name: &str, period: i32) -> ApiResult<Renewal> {
        let parameters = self.request(json!({
            "DomainName": domain_name,
            "Period": period,
        }));

        match self.call("Renew", parameters).await {
            Ok(data) => {
                let expiration_date = text(&data, "ExpirationDate");
                if expiration_date.is_empty() {
                    ApiResult::Raw(data)
                } else {
                    ApiResult::Ok(Renewal { expiration_date })
                }
            }
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Register a domain with full contact information.
    pub async fn register_with_contact_info(
        &self,
        domain_name: &str,
        period: i32,
        contacts: &ContactRoles,
        options: RegistrationOptions,
    ) -> ApiResult<DomainInfo> {
        let mut fields = json!({
            "DomainName": domain_name,
            "Period": period,
            "NameServerList": { "string": options.name_servers },
            "LockStatus": options.epp_lock,
            "PrivacyProtectionStatus": options.privacy_lock,
            "AdministrativeContact": contacts.administrative,
            "BillingContact": contacts.billing,
            "TechnicalContact": contacts.technical,
            "RegistrantContact": contacts.registrant,
        });

        if !options.additional_attributes.is_empty() {
            let pairs: Vec<Value> = options
                .additional_attributes
                .iter()
                .map(|(key, value)| json!({ "Key": key, "Value": value }))
                .collect();
            fields["AdditionalAttributes"] = json!({ "KeyValueOfstringstring": pairs });
        }

        let parameters = self.request(fields);
        self.domain_info_result("RegisterWithContactInfo", parameters).await
    }

    /// Enable or disable WHOIS privacy protection. Always reports success
    /// by echoing the requested status; a blank reason is replaced with the
    /// default.
    pub async fn modify_privacy_protection_status(
        &self,
        domain_name: &str,
        status: bool,
        reason: Option<&str>,
    ) -> ApiResult<PrivacyProtection> {
        let reason = match reason {
            Some(reason) if !reason.trim().is_empty() => reason,
            _ => DEFAULT_PRIVACY_REASON,
        };

        let parameters = self.request(json!({
            "DomainName": domain_name,
            "ProtectPrivacy": status,
            "Reason": reason,
        }));

        match self.call("ModifyPrivacyProtectionStatus", parameters).await {
            Ok(_) => ApiResult::Ok(PrivacyProtection { status }),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Re-read a domain's state from the registry.
    pub async fn sync_from_registry(&self, domain_name: &str) -> ApiResult<DomainInfo> {
        let parameters = self.request(json!({ "DomainName": domain_name }));
        self.domain_info_result("SyncFromRegistry", parameters).await
    }

    /// Current reseller balance for a currency. The payload is returned
    /// untransformed.
    ///
    /// Currency matching is case-insensitive: `"USD"` maps to id 2, any of
    /// `"TRY"`/`"TL"`/`"1"` to id 1, anything else (or no argument) to 2.
    pub async fn get_current_balance(&self, currency: Option<&str>) -> ApiResult<Value> {
        let parameters = self.request(json!({
            "CurrencyId": normalize_currency(currency),
        }));

        match self.call("GetCurrentBalance", parameters).await {
            Ok(data) => ApiResult::Ok(data),
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Check availability of every (domain, tld) combination. `period`
    /// defaults to 1, `command` to `"create"`.
    pub async fn check_availability(
        &self,
        domains: &[&str],
        extensions: &[&str],
        period: Option<i32>,
        command: Option<&str>,
    ) -> ApiResult<Vec<AvailabilityInfo>> {
        let parameters = self.request(json!({
            "DomainNameList": { "string": domains },
            "TldList": { "string": extensions },
            "Period": period.unwrap_or(1),
            // upstream request key spelling
            "Commad": command.unwrap_or("create"),
        }));

        match self.call("CheckAvailability", parameters).await {
            Ok(data) => {
                let records = as_list(&data["DomainAvailabilityInfoList"]["DomainAvailabilityInfo"]);
                ApiResult::Ok(records.iter().map(parse_availability_info).collect())
            }
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// List domains in the account. `extra_parameters` object fields (paging,
    /// filters) are merged into the request verbatim.
    pub async fn get_list(&self, extra_parameters: Value) -> ApiResult<DomainList> {
        let fields = if extra_parameters.is_object() {
            extra_parameters
        } else {
            json!({})
        };
        let parameters = self.request(fields);

        match self.call("GetList", parameters).await {
            Ok(data) => match data["TotalCount"].as_i64() {
                Some(total_count) => {
                    let domains = as_list(&data["DomainInfoList"]["DomainInfo"])
                        .iter()
                        .map(parse_domain_info)
                        .collect();
                    ApiResult::Ok(DomainList { domains, total_count })
                }
                None => ApiResult::Raw(data),
            },
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// List available TLDs with price definitions. `count` is the page
    /// size, default 20.
    pub async fn get_tld_list(&self, count: Option<u32>) -> ApiResult<Vec<TldInfo>> {
        let parameters = self.request(json!({
            "IncludePriceDefinitions": 1,
            "PageSize": count.unwrap_or(DEFAULT_TLD_PAGE_SIZE),
        }));

        match self.call("GetTldList", parameters).await {
            Ok(data) => {
                let tlds = as_list(&data["TldInfoList"]["TldInfo"]);
                if tlds.is_empty() {
                    ApiResult::Raw(data)
                } else {
                    ApiResult::Ok(tlds.iter().map(parse_tld_info).collect())
                }
            }
            Err(failure) => ApiResult::Err(failure),
        }
    }

    /// Fetch the full record of a single domain.
    pub async fn get_details(&self, domain_name: &str) -> ApiResult<DomainInfo> {
        let parameters = self.request(json!({ "DomainName": domain_name }));
        self.domain_info_result("GetDetails", parameters).await
    }

    /// Fetch reseller account details and balances.
    pub async fn get_reseller_details(&self) -> ApiResult<ResellerDetails> {
        let parameters = self.request(json!({ "CurrencyId": 2 }));

        match self.call("GetResellerDetails", parameters).await {
            Ok(data) => {
                let info = &data["ResellerInfo"];
                if !info.is_object() {
                    return ApiResult::Raw(data);
                }

                let balances: Vec<_> = as_list(&info["BalanceInfoList"]["BalanceInfo"])
                    .iter()
                    .map(parse_balance_entry)
                    .collect();

                let configured = text(&info["CurrencyInfo"], "Code");
                let active_balance = balances
                    .iter()
                    .find(|entry| entry.currency == configured)
                    .or_else(|| balances.first())
                    .cloned()
                    .unwrap_or_default();

                ApiResult::Ok(ResellerDetails {
                    id: text(info, "Id"),
                    active: text(info, "Status") == "Active",
                    name: text(info, "Name"),
                    balance: active_balance.balance,
                    currency: active_balance.currency,
                    symbol: active_balance.symbol,
                    balances,
                })
            }
            Err(failure) => ApiResult::Err(failure),
        }
    }

    // Shared reshape for operations whose success payload is a DomainInfo
    // structure.
    async fn domain_info_result(
        &self,
        operation: &str,
        parameters: Value,
    ) -> ApiResult<DomainInfo> {
        match self.call(operation, parameters).await {
            Ok(data) => {
                if data["DomainInfo"].is_object() {
                    ApiResult::Ok(parse_domain_info(&data["DomainInfo"]))
                } else {
                    ApiResult::Raw(data)
                }
            }
            Err(failure) => ApiResult::Err(failure),
        }
    }
}

fn normalize_currency(currency: Option<&str>) -> i64 {
    match currency.map(str::to_uppercase) {
        Some(code) if code == "USD" => 2,
        Some(code) if code == "TRY" || code == "TL" || code == "1" => 1,
        _ => 2,
    }
}
