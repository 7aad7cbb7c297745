//! Shared types for the DomainNameAPI adapter.
//!
//! Upstream SOAP payloads arrive as loosely structured `serde_json::Value`
//! trees. The parsers below normalise them into these typed records. Every
//! field defaults independently to an empty string or an empty collection
//! when the upstream payload omits it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrap a bare object into a one-element list.
///
/// SOAP list fields arrive either as a single object or as an array
/// depending on how many elements the response carried. Every
/// single-vs-list site goes through this helper so both shapes produce
/// identical output.
pub fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Scalar field as a string, `""` when absent.
pub(crate) fn text(data: &Value, key: &str) -> String {
    match &data[key] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Boolean field rendered as `"true"`/`"false"`, `""` when not a boolean.
fn bool_text(data: &Value, key: &str) -> String {
    match &data[key] {
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn integer(data: &Value, key: &str) -> i64 {
    match &data[key] {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn number(data: &Value, key: &str) -> f64 {
    match &data[key] {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn flag(data: &Value, key: &str) -> bool {
    match &data[key] {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Flatten a nameserver/IP-style field into a list of strings.
///
/// Handles the `{"string": ...}` wrapper the service puts around string
/// arrays, as well as bare scalars and plain arrays.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) if map.contains_key("string") => string_list(&map["string"]),
        Value::Array(items) => items.iter().flat_map(string_list).collect(),
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

/// Contact-ID reference carried inside a domain record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIdRef {
    #[serde(rename = "ID")]
    pub id: String,
}

/// The four contact-ID references of a domain record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainContacts {
    #[serde(rename = "Administrative")]
    pub administrative: ContactIdRef,
    #[serde(rename = "Billing")]
    pub billing: ContactIdRef,
    #[serde(rename = "Technical")]
    pub technical: ContactIdRef,
    #[serde(rename = "Registrant")]
    pub registrant: ContactIdRef,
}

/// Registration date triple. Dates are passed through as upstream strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDates {
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "Expiration")]
    pub expiration: String,
    #[serde(rename = "RemainingDays")]
    pub remaining_days: String,
}

/// One child-nameserver (glue record) entry of a domain record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildNameServerEntry {
    pub ns: String,
    pub ip: Vec<String>,
}

/// Normalised domain record produced by [`parse_domain_info`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "DomainName")]
    pub domain_name: String,
    #[serde(rename = "AuthCode")]
    pub auth_code: String,
    /// `"true"`/`"false"` when upstream sent a boolean, `""` otherwise.
    #[serde(rename = "LockStatus")]
    pub lock_status: String,
    #[serde(rename = "PrivacyProtectionStatus")]
    pub privacy_protection_status: String,
    #[serde(rename = "IsChildNameServer")]
    pub is_child_name_server: String,
    #[serde(rename = "Contacts")]
    pub contacts: DomainContacts,
    #[serde(rename = "Dates")]
    pub dates: DomainDates,
    #[serde(rename = "NameServers")]
    pub name_servers: Vec<String>,
    /// Open-ended key/value attributes attached to the domain.
    #[serde(rename = "Additional")]
    pub additional: BTreeMap<String, String>,
    #[serde(rename = "ChildNameServers")]
    pub child_name_servers: Vec<ChildNameServerEntry>,
}

/// Postal address block of a contact record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAddress {
    #[serde(rename = "Line1")]
    pub line1: String,
    #[serde(rename = "Line2")]
    pub line2: String,
    #[serde(rename = "Line3")]
    pub line3: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "ZipCode")]
    pub zip_code: String,
}

/// Phone or fax number of a contact record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactNumber {
    #[serde(rename = "Number")]
    pub number: String,
    #[serde(rename = "CountryCode")]
    pub country_code: String,
}

/// Normalised contact record produced by [`parse_contact_info`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Address")]
    pub address: ContactAddress,
    #[serde(rename = "Phone")]
    pub phone: ContactNumber,
    #[serde(rename = "Fax")]
    pub fax: ContactNumber,
    #[serde(rename = "AuthCode")]
    pub auth_code: String,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "EMail")]
    pub email: String,
    /// Contact role type as reported upstream.
    #[serde(rename = "Type")]
    pub contact_type: String,
}

/// The four parsed contact records returned by `GetContacts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactSet {
    #[serde(rename = "Administrative")]
    pub administrative: ContactInfo,
    #[serde(rename = "Billing")]
    pub billing: ContactInfo,
    #[serde(rename = "Registrant")]
    pub registrant: ContactInfo,
    #[serde(rename = "Technical")]
    pub technical: ContactInfo,
}

/// Contact payloads for the four registry roles, sent verbatim upstream by
/// `SaveContacts` and `RegisterWithContactInfo`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactRoles {
    pub administrative: Value,
    pub billing: Value,
    pub technical: Value,
    pub registrant: Value,
}

/// Echo shape returned by the child-nameserver operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChildNameServer {
    #[serde(rename = "NameServer")]
    pub name_server: String,
    /// Upstream wire spelling preserved.
    #[serde(rename = "IPAdresses", skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
}

/// Outcome of the transfer-decision operations (cancel/approve/reject).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferDecision {
    /// Upstream `result` field passed through verbatim, without the
    /// SUCCESS-marker re-derivation used elsewhere.
    pub result: bool,
    #[serde(rename = "DomainName")]
    pub domain_name: String,
}

/// Success payload of `Renew`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Renewal {
    #[serde(rename = "ExpirationDate")]
    pub expiration_date: String,
}

/// Echo payload of `ModifyPrivacyProtectionStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrivacyProtection {
    #[serde(rename = "PrivacyProtectionStatus")]
    pub status: bool,
}

/// One availability record returned by `CheckAvailability`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailabilityInfo {
    #[serde(rename = "TLD")]
    pub tld: String,
    #[serde(rename = "DomainName")]
    pub domain_name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Command")]
    pub command: String,
    #[serde(rename = "Period")]
    pub period: i64,
    #[serde(rename = "IsFee")]
    pub is_fee: bool,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Reason")]
    pub reason: String,
}

/// Paged domain listing returned by `GetList`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainList {
    pub domains: Vec<DomainInfo>,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
}

/// One TLD definition returned by `GetTldList`.
///
/// `pricing` maps a lower-cased trade type ("new", "renew", "transfer") to
/// a period→price map; `currencies` maps the same keys to a currency name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TldInfo {
    pub id: i64,
    pub status: String,
    pub maxchar: i64,
    pub maxperiod: i64,
    pub minchar: i64,
    pub minperiod: i64,
    pub tld: String,
    pub pricing: BTreeMap<String, BTreeMap<i64, f64>>,
    pub currencies: BTreeMap<String, String>,
}

/// One reseller balance entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceEntry {
    pub balance: f64,
    pub currency: String,
    pub symbol: String,
}

/// Reseller account details returned by `GetResellerDetails`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResellerDetails {
    pub id: String,
    /// Upstream status literally equals `"Active"`.
    pub active: bool,
    pub name: String,
    /// Balance in the reseller's configured currency (first entry when no
    /// currency matches).
    pub balance: f64,
    pub currency: String,
    pub symbol: String,
    pub balances: Vec<BalanceEntry>,
}

/// Parse a loose upstream `DomainInfo` structure into a [`DomainInfo`].
///
/// Pure; tolerates partially populated payloads.
pub fn parse_domain_info(data: &Value) -> DomainInfo {
    DomainInfo {
        id: text(data, "Id"),
        status: text(data, "Status"),
        domain_name: text(data, "DomainName"),
        auth_code: text(data, "Auth"),
        lock_status: bool_text(data, "LockStatus"),
        privacy_protection_status: bool_text(data, "PrivacyProtectionStatus"),
        is_child_name_server: bool_text(data, "IsChildNameServer"),
        contacts: DomainContacts {
            administrative: ContactIdRef { id: text(data, "AdministrativeContactId") },
            billing: ContactIdRef { id: text(data, "BillingContactId") },
            technical: ContactIdRef { id: text(data, "TechnicalContactId") },
            registrant: ContactIdRef { id: text(data, "RegistrantContactId") },
        },
        dates: DomainDates {
            start: text(data, "StartDate"),
            expiration: text(data, "ExpirationDate"),
            remaining_days: text(data, "RemainingDay"),
        },
        name_servers: string_list(&data["NameServerList"]),
        additional: parse_additional_attributes(&data["AdditionalAttributes"]),
        child_name_servers: as_list(&data["ChildNameServerInfo"])
            .iter()
            .map(parse_child_name_server)
            .collect(),
    }
}

fn parse_additional_attributes(value: &Value) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for pair in as_list(&value["KeyValueOfstringstring"]) {
        let key = text(&pair, "Key");
        let val = text(&pair, "Value");
        if !key.is_empty() && !val.is_empty() {
            attributes.insert(key, val);
        }
    }
    attributes
}

fn parse_child_name_server(value: &Value) -> ChildNameServerEntry {
    ChildNameServerEntry {
        ns: text(value, "ChildNameServer"),
        ip: string_list(&value["IpAddress"]),
    }
}

/// Parse a loose upstream contact structure into a [`ContactInfo`].
pub fn parse_contact_info(data: &Value) -> ContactInfo {
    ContactInfo {
        id: text(data, "Id"),
        status: text(data, "Status"),
        address: ContactAddress {
            line1: text(data, "AddressLine1"),
            line2: text(data, "AddressLine2"),
            line3: text(data, "AddressLine3"),
            state: text(data, "State"),
            city: text(data, "City"),
            country: text(data, "Country"),
            zip_code: text(data, "ZipCode"),
        },
        phone: ContactNumber {
            number: text(data, "Phone"),
            country_code: text(data, "PhoneCountryCode"),
        },
        fax: ContactNumber {
            number: text(data, "Fax"),
            country_code: text(data, "FaxCountryCode"),
        },
        auth_code: text(data, "Auth"),
        first_name: text(data, "FirstName"),
        last_name: text(data, "LastName"),
        company: text(data, "Company"),
        email: text(data, "EMail"),
        contact_type: text(data, "Type"),
    }
}

pub(crate) fn parse_availability_info(data: &Value) -> AvailabilityInfo {
    AvailabilityInfo {
        tld: text(data, "Tld"),
        domain_name: text(data, "DomainName"),
        status: text(data, "Status"),
        command: text(data, "Command"),
        period: integer(data, "Period"),
        is_fee: flag(data, "IsFee"),
        price: number(data, "Price"),
        currency: text(data, "Currency"),
        reason: text(data, "Reason"),
    }
}

pub(crate) fn parse_tld_info(data: &Value) -> TldInfo {
    let mut pricing: BTreeMap<String, BTreeMap<i64, f64>> = BTreeMap::new();
    let mut currencies = BTreeMap::new();

    for price in as_list(&data["PriceInfoList"]["TldPriceInfo"]) {
        let trade_type = text(&price, "TradeType").to_lowercase();
        if trade_type.is_empty() {
            continue;
        }
        // One period per trade type; a later entry for the same trade type
        // replaces the earlier one.
        let mut periods = BTreeMap::new();
        periods.insert(integer(&price, "Period"), number(&price, "Price"));
        currencies.insert(trade_type.clone(), text(&price, "CurrencyName"));
        pricing.insert(trade_type, periods);
    }

    TldInfo {
        id: integer(data, "Id"),
        status: text(data, "Status"),
        maxchar: integer(data, "MaxCharacterCount"),
        maxperiod: integer(data, "MaxRegistrationPeriod"),
        minchar: integer(data, "MinCharacterCount"),
        minperiod: integer(data, "MinRegistrationPeriod"),
        tld: text(data, "Name"),
        pricing,
        currencies,
    }
}

pub(crate) fn parse_balance_entry(data: &Value) -> BalanceEntry {
    BalanceEntry {
        balance: number(data, "Balance"),
        currency: text(data, "CurrencyName"),
        symbol: text(data, "CurrencySymbol"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn as_list_wraps_single_object() {
        let single = json!({"a": 1});
        assert_eq!(as_list(&single), vec![single.clone()]);

        let list = json!([{"a": 1}, {"a": 2}]);
        assert_eq!(as_list(&list).len(), 2);

        assert!(as_list(&Value::Null).is_empty());
    }

    #[test]
    fn domain_parser_defaults_every_field() {
        let parsed = parse_domain_info(&json!({}));
        assert_eq!(parsed.id, "");
        assert_eq!(parsed.domain_name, "");
        assert_eq!(parsed.status, "");
        assert_eq!(parsed.auth_code, "");
        assert_eq!(parsed.lock_status, "");
        assert_eq!(parsed.privacy_protection_status, "");
        assert_eq!(parsed.is_child_name_server, "");
        assert_eq!(parsed.contacts.administrative.id, "");
        assert_eq!(parsed.dates.start, "");
        assert!(parsed.name_servers.is_empty());
        assert!(parsed.additional.is_empty());
        assert!(parsed.child_name_servers.is_empty());
    }

    #[test]
    fn domain_parser_maps_populated_payload() {
        let parsed = parse_domain_info(&json!({
            "Id": 42,
            "Status": "Active",
            "DomainName": "example.com",
            "Auth": "epp-123",
            "LockStatus": true,
            "PrivacyProtectionStatus": false,
            "IsChildNameServer": false,
            "AdministrativeContactId": 7,
            "BillingContactId": 8,
            "TechnicalContactId": 9,
            "RegistrantContactId": 10,
            "StartDate": "2024-01-01",
            "ExpirationDate": "2025-01-01",
            "RemainingDay": 120,
            "NameServerList": ["ns1.example.com", "ns2.example.com"],
        }));

        assert_eq!(parsed.id, "42");
        assert_eq!(parsed.domain_name, "example.com");
        assert_eq!(parsed.auth_code, "epp-123");
        assert_eq!(parsed.lock_status, "true");
        assert_eq!(parsed.privacy_protection_status, "false");
        assert_eq!(parsed.contacts.registrant.id, "10");
        assert_eq!(parsed.dates.expiration, "2025-01-01");
        assert_eq!(parsed.dates.remaining_days, "120");
        assert_eq!(parsed.name_servers.len(), 2);
    }

    #[test]
    fn domain_parser_wraps_single_nameserver() {
        let parsed = parse_domain_info(&json!({"NameServerList": "ns1.example.com"}));
        assert_eq!(parsed.name_servers, vec!["ns1.example.com"]);

        let wrapped = parse_domain_info(&json!({
            "NameServerList": {"string": ["ns1.example.com", "ns2.example.com"]}
        }));
        assert_eq!(wrapped.name_servers.len(), 2);
    }

    #[test]
    fn domain_parser_collects_additional_attributes() {
        let listed = parse_domain_info(&json!({
            "AdditionalAttributes": {"KeyValueOfstringstring": [
                {"Key": "TRANSFERPERIOD", "Value": "1"},
                {"Key": "ORG", "Value": "Example"},
                {"Key": "EMPTY", "Value": ""},
            ]}
        }));
        assert_eq!(listed.additional.len(), 2);
        assert_eq!(listed.additional["TRANSFERPERIOD"], "1");

        let single = parse_domain_info(&json!({
            "AdditionalAttributes": {"KeyValueOfstringstring": {"Key": "ORG", "Value": "Example"}}
        }));
        assert_eq!(single.additional.len(), 1);
        assert_eq!(single.additional["ORG"], "Example");
    }

    #[test]
    fn domain_parser_normalises_child_nameservers() {
        let single = parse_domain_info(&json!({
            "ChildNameServerInfo": {
                "ChildNameServer": "ns1.example.com",
                "IpAddress": {"string": "1.2.3.4"},
            }
        }));
        assert_eq!(single.child_name_servers.len(), 1);
        assert_eq!(single.child_name_servers[0].ns, "ns1.example.com");
        assert_eq!(single.child_name_servers[0].ip, vec!["1.2.3.4"]);

        let listed = parse_domain_info(&json!({
            "ChildNameServerInfo": [
                {"ChildNameServer": "ns1.example.com", "IpAddress": {"string": ["1.2.3.4", "5.6.7.8"]}},
                {"ChildNameServer": "ns2.example.com"},
            ]
        }));
        assert_eq!(listed.child_name_servers.len(), 2);
        assert_eq!(listed.child_name_servers[0].ip.len(), 2);
        assert!(listed.child_name_servers[1].ip.is_empty());
    }

    #[test]
    fn contact_parser_defaults_every_field() {
        let parsed = parse_contact_info(&json!({}));
        assert_eq!(parsed.id, "");
        assert_eq!(parsed.address.line1, "");
        assert_eq!(parsed.address.country, "");
        assert_eq!(parsed.phone.number, "");
        assert_eq!(parsed.fax.country_code, "");
        assert_eq!(parsed.email, "");
        assert_eq!(parsed.contact_type, "");
    }

    #[test]
    fn contact_parser_maps_populated_payload() {
        let parsed = parse_contact_info(&json!({
            "Id": 7,
            "Status": "OK",
            "AddressLine1": "1 Main St",
            "City": "Springfield",
            "Country": "US",
            "ZipCode": "12345",
            "Phone": "5551234",
            "PhoneCountryCode": "1",
            "Fax": "5555678",
            "FaxCountryCode": "1",
            "Auth": "c-auth",
            "FirstName": "Jane",
            "LastName": "Doe",
            "Company": "Example LLC",
            "EMail": "jane@example.com",
            "Type": "Registrant",
        }));

        assert_eq!(parsed.id, "7");
        assert_eq!(parsed.address.line1, "1 Main St");
        assert_eq!(parsed.address.zip_code, "12345");
        assert_eq!(parsed.phone.country_code, "1");
        assert_eq!(parsed.first_name, "Jane");
        assert_eq!(parsed.email, "jane@example.com");
        assert_eq!(parsed.contact_type, "Registrant");
    }

    #[test]
    fn tld_parser_keys_pricing_by_trade_type() {
        let parsed = parse_tld_info(&json!({
            "Id": 3,
            "Status": "Active",
            "MaxCharacterCount": 63,
            "MaxRegistrationPeriod": 10,
            "MinCharacterCount": 2,
            "MinRegistrationPeriod": 1,
            "Name": "com",
            "PriceInfoList": {"TldPriceInfo": [
                {"TradeType": "New", "Period": 1, "Price": 10.0, "CurrencyName": "USD"},
                {"TradeType": "Renew", "Period": 1, "Price": 12.0, "CurrencyName": "USD"},
            ]}
        }));

        assert_eq!(parsed.tld, "com");
        assert_eq!(parsed.pricing["new"][&1], 10.0);
        assert_eq!(parsed.pricing["renew"][&1], 12.0);
        assert_eq!(parsed.currencies["new"], "USD");
        assert_eq!(parsed.currencies["renew"], "USD");
    }

    #[test]
    fn tld_parser_last_entry_per_trade_type_wins() {
        let parsed = parse_tld_info(&json!({
            "Name": "net",
            "PriceInfoList": {"TldPriceInfo": [
                {"TradeType": "New", "Period": 1, "Price": 10.0, "CurrencyName": "USD"},
                {"TradeType": "New", "Period": 2, "Price": 18.0, "CurrencyName": "USD"},
            ]}
        }));

        assert_eq!(parsed.pricing["new"].len(), 1);
        assert_eq!(parsed.pricing["new"][&2], 18.0);
    }

    #[test]
    fn availability_parser_tolerates_string_scalars() {
        let parsed = parse_availability_info(&json!({
            "Tld": "com",
            "DomainName": "example",
            "Status": "available",
            "Command": "create",
            "Period": "2",
            "IsFee": "True",
            "Price": "9.99",
            "Currency": "USD",
            "Reason": "",
        }));

        assert_eq!(parsed.period, 2);
        assert!(parsed.is_fee);
        assert_eq!(parsed.price, 9.99);
    }
}
