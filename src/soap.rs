//! SOAP transport layer.
//!
//! [`SoapTransport`] is the seam between the adapter and the wire: operation
//! methods hand it a parameter tree and get back the loosely structured
//! response payload. [`HttpSoapTransport`] is the production implementation:
//! a reqwest client that posts SOAP 1.1 envelopes to the service endpoint
//! and parses response XML into `serde_json::Value` trees. Tests substitute
//! their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Fixed production URL serving the service description document.
pub const SERVICE_URL: &str = "https://whmcs.domainnameapi.com/DomainApi.svc?singlewsdl";

/// Target namespace of the service; used for body elements and SOAPAction.
pub const SERVICE_NS: &str = "http://tcpdomain";

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const CONNECT_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Transport-level errors. These never reach adapter callers directly; the
/// client folds them into the `exception` failure level.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Asynchronous invoke-by-name seam over the remote service.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Invoke the named remote procedure with the given parameter tree and
    /// return the loosely structured response payload.
    async fn invoke(&self, operation: &str, parameters: &Value) -> Result<Value, TransportError>;
}

/// Production transport: SOAP 1.1 over HTTPS.
pub struct HttpSoapTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSoapTransport {
    /// Establish the shared service connection.
    ///
    /// Builds the HTTP client (certificate validation disabled, 20 s
    /// connection-setup timeout) and fetches the service description once to
    /// confirm the endpoint is reachable. The call endpoint is the
    /// description URL minus its query string.
    pub async fn connect(service_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let response = client.get(service_url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::UnexpectedResponse(format!(
                "service description fetch returned {}",
                response.status()
            )));
        }
        let description = response.text().await?;
        debug!(bytes = description.len(), "fetched service description");

        let endpoint = service_url
            .split('?')
            .next()
            .unwrap_or(service_url)
            .to_string();

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SoapTransport for HttpSoapTransport {
    async fn invoke(&self, operation: &str, parameters: &Value) -> Result<Value, TransportError> {
        let envelope = build_envelope(operation, parameters);
        debug!(operation, endpoint = %self.endpoint, "sending SOAP request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{SERVICE_NS}/IDomainApi/{operation}\""))
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Faults arrive with non-2xx statuses but still carry a SOAP body,
        // so the status alone is not a failure.
        match parse_response(&body) {
            Ok(tree) => body_payload(operation, &tree),
            Err(err) if !status.is_success() => Err(TransportError::UnexpectedResponse(
                format!("HTTP {status} with unparsable body: {err}"),
            )),
            Err(err) => Err(err),
        }
    }
}

/// Serialize a SOAP 1.1 request envelope for the given operation.
pub(crate) fn build_envelope(operation: &str, parameters: &Value) -> String {
    let mut body = String::new();
    if let Some(map) = parameters.as_object() {
        for (key, value) in map {
            write_element(&mut body, key, value);
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <soap:Envelope xmlns:soap=\"{SOAP_ENVELOPE_NS}\">\
         <soap:Body>\
         <{operation} xmlns=\"{SERVICE_NS}\">{body}</{operation}>\
         </soap:Body>\
         </soap:Envelope>"
    )
}

fn write_element(buf: &mut String, name: &str, value: &Value) {
    match value {
        // Arrays become repeated sibling elements.
        Value::Array(items) => {
            for item in items {
                write_element(buf, name, item);
            }
        }
        Value::Object(map) => {
            buf.push_str(&format!("<{name}>"));
            for (key, item) in map {
                write_element(buf, key, item);
            }
            buf.push_str(&format!("</{name}>"));
        }
        Value::Null => buf.push_str(&format!("<{name}/>")),
        Value::String(s) => buf.push_str(&format!("<{name}>{}</{name}>", escape(s.as_str()))),
        other => buf.push_str(&format!("<{name}>{other}</{name}>")),
    }
}

struct Node {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Node {
    fn new(name: String) -> Self {
        Self { name, children: Map::new(), text: String::new() }
    }
}

/// Parse a SOAP response document into a `Value` tree.
///
/// Elements become object keys (namespace prefixes stripped), repeated
/// sibling elements become arrays, and text content becomes scalars with
/// light coercion so downstream checks see booleans and numbers the way the
/// service declared them. DOCTYPE and entity declarations are rejected;
/// quick-xml does not expand entities in the first place.
pub(crate) fn parse_response(xml: &str) -> Result<Value, TransportError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut stack = vec![Node::new(String::new())];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(Node::new(local_name(e.name().as_ref())));
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    insert_child(parent, name, Value::Null);
                }
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|err| TransportError::Xml(err.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref t)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Ok(Event::End(_)) => {
                let node = match stack.pop() {
                    Some(node) => node,
                    None => return Err(TransportError::Xml("unbalanced document".to_string())),
                };
                let value = if node.children.is_empty() {
                    coerce_scalar(&node.text)
                } else {
                    Value::Object(node.children)
                };
                if let Some(parent) = stack.last_mut() {
                    insert_child(parent, node.name, value);
                }
            }
            Ok(Event::DocType(_)) => {
                return Err(TransportError::Xml("DOCTYPE declarations are not allowed".to_string()));
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(TransportError::Xml(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    match stack.pop() {
        Some(root) if stack.is_empty() => Ok(Value::Object(root.children)),
        _ => Err(TransportError::Xml("unbalanced document".to_string())),
    }
}

/// Extract the operation response object from a parsed envelope.
///
/// A SOAP Fault body is surfaced under the `"<operation>Result"` key so the
/// envelope normalization's fault branch sees its `faultcode`.
fn body_payload(operation: &str, tree: &Value) -> Result<Value, TransportError> {
    let body = &tree["Envelope"]["Body"];
    let map = body
        .as_object()
        .ok_or_else(|| TransportError::UnexpectedResponse("missing SOAP Body".to_string()))?;
    let (name, value) = map
        .iter()
        .next()
        .ok_or_else(|| TransportError::UnexpectedResponse("empty SOAP Body".to_string()))?;

    if name == "Fault" {
        let mut wrapper = Map::new();
        wrapper.insert(format!("{operation}Result"), value.clone());
        return Ok(Value::Object(wrapper));
    }

    Ok(value.clone())
}

fn insert_child(parent: &mut Node, name: String, value: Value) {
    match parent.children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.children.insert(name, value);
        }
    }
}

fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    match name.rsplit(':').next() {
        Some(local) => local.to_string(),
        None => name.into_owned(),
    }
}

/// Coerce element text to the scalar the service declared. Only values that
/// round-trip exactly are converted, so zero-padded identifiers and auth
/// codes stay strings.
fn coerce_scalar(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        if n.to_string() == text {
            return Value::Number(n.into());
        }
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.to_string() == text {
            if let Some(number) = serde_json::Number::from_f64(f) {
                return Value::Number(number);
            }
        }
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_embeds_operation_and_fields() {
        let envelope = build_envelope(
            "Renew",
            &json!({"request": {"DomainName": "example.com", "Period": 2}}),
        );

        assert!(envelope.contains(&format!("<Renew xmlns=\"{SERVICE_NS}\">")));
        assert!(envelope.contains("<DomainName>example.com</DomainName>"));
        assert!(envelope.contains("<Period>2</Period>"));
        assert!(envelope.contains("</Renew>"));
    }

    #[test]
    fn envelope_repeats_array_elements() {
        let envelope = build_envelope(
            "CheckAvailability",
            &json!({"request": {"DomainNameList": {"string": ["a", "b"]}}}),
        );

        assert!(envelope.contains("<string>a</string><string>b</string>"));
    }

    #[test]
    fn envelope_escapes_text_content() {
        let envelope = build_envelope("Renew", &json!({"request": {"DomainName": "a&b<c"}}));
        assert!(envelope.contains("<DomainName>a&amp;b&lt;c</DomainName>"));
    }

    #[test]
    fn parses_nested_elements_into_objects() {
        let tree = parse_response(
            "<Envelope><Body><RenewResponse><RenewResult>\
             <OperationResult>SUCCESS</OperationResult>\
             <ExpirationDate>2025-01-01</ExpirationDate>\
             </RenewResult></RenewResponse></Body></Envelope>",
        )
        .unwrap();

        let payload = &tree["Envelope"]["Body"]["RenewResponse"]["RenewResult"];
        assert_eq!(payload["OperationResult"], "SUCCESS");
        assert_eq!(payload["ExpirationDate"], "2025-01-01");
    }

    #[test]
    fn repeated_siblings_become_arrays() {
        let tree = parse_response(
            "<List><Item>1</Item><Item>2</Item><Item>3</Item></List>",
        )
        .unwrap();

        assert_eq!(tree["List"]["Item"], json!([1, 2, 3]));
    }

    #[test]
    fn single_element_stays_scalar() {
        let tree = parse_response("<List><Item>only</Item></List>").unwrap();
        assert_eq!(tree["List"]["Item"], "only");
    }

    #[test]
    fn strips_namespace_prefixes() {
        let tree = parse_response(
            "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">\
             <s:Body><a:Ok xmlns:a=\"urn:x\">1</a:Ok></s:Body></s:Envelope>",
        )
        .unwrap();

        assert_eq!(tree["Envelope"]["Body"]["Ok"], 1);
    }

    #[test]
    fn coerces_booleans_and_numbers() {
        let tree = parse_response(
            "<R><Flag>true</Flag><Count>42</Count><Auth>007</Auth><Ip>1.2.3.4</Ip></R>",
        )
        .unwrap();

        assert_eq!(tree["R"]["Flag"], true);
        assert_eq!(tree["R"]["Count"], 42);
        // zero-padded text must stay a string
        assert_eq!(tree["R"]["Auth"], "007");
        assert_eq!(tree["R"]["Ip"], "1.2.3.4");
    }

    #[test]
    fn rejects_doctype_declarations() {
        let result = parse_response(
            "<?xml version=\"1.0\"?><!DOCTYPE foo [<!ENTITY x SYSTEM \"file:///etc/passwd\">]><a>&x;</a>",
        );
        assert!(matches!(result, Err(TransportError::Xml(_))));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse_response("<a><b></a>").is_err());
    }

    #[test]
    fn fault_body_surfaces_under_result_key() {
        let tree = parse_response(
            "<Envelope><Body><Fault>\
             <faultcode>soap:Server</faultcode>\
             <faultstring>boom</faultstring>\
             </Fault></Body></Envelope>",
        )
        .unwrap();

        let payload = body_payload("Renew", &tree).unwrap();
        assert_eq!(payload["RenewResult"]["faultcode"], "soap:Server");
        assert_eq!(payload["RenewResult"]["faultstring"], "boom");
    }

    #[test]
    fn missing_body_is_an_error() {
        let tree = parse_response("<Envelope><Other/></Envelope>").unwrap();
        assert!(body_payload("Renew", &tree).is_err());
    }
}
