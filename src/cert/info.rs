//! Structured certificate properties and the matching rules built on them.
//!
//! Every [`Certificate`](crate::cert::Certificate) derives a property map once
//! and memoizes it. Trust decisions (store lookups, issuer matching, cache
//! keys) operate on this map rather than on raw DER, so the derivation and
//! comparison rules here are security-relevant and deliberately conservative.

use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519;
use der::asn1::{Ia5StringRef, PrintableStringRef, TeletexStringRef, Utf8StringRef};
use der::{Tag, Tagged};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::RdnSequence;
use x509_cert::time::Time;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
    find_extension,
};

/// Property map of a decoded certificate.
///
/// Keys are the `*_NAME`/`*_STRING`/extension constants in this module; values
/// are strings, nested maps, or arrays of strings. Keys whose source field or
/// extension is absent (or undecodable) are simply missing from the map.
pub type CertInfo = Map<String, Value>;

/// Subject distinguished name as a map of attribute long-name to value.
pub const SUBJECT_NAME: &str = "subject_name";
/// Issuer distinguished name as a map of attribute long-name to value.
pub const ISSUER_NAME: &str = "issuer_name";
/// Subject distinguished name in RFC 4514 display form.
pub const SUBJECT_NAME_STRING: &str = "subject_name_string";
/// Issuer distinguished name in RFC 4514 display form.
pub const ISSUER_NAME_STRING: &str = "issuer_name_string";
/// Serial number as uppercase hex with leading zeros stripped.
pub const SERIAL_NUMBER: &str = "serial_number";
/// Start of the validity window, RFC 3339.
pub const VALID_FROM: &str = "valid_from";
/// End of the validity window, RFC 3339.
pub const VALID_TO: &str = "valid_to";
/// Subject key identifier as lowercase colon-separated hex.
pub const SUBJECT_KEY_IDENTIFIER: &str = "subject_key_identifier";
/// Authority key identifier: a map with [`AUTHORITY_KEY_ID`] and/or
/// [`AUTHORITY_KEY_SERIAL`] entries.
pub const AUTHORITY_KEY_IDENTIFIER: &str = "authority_key_identifier";
/// Issuer key id inside [`AUTHORITY_KEY_IDENTIFIER`], same form as
/// [`SUBJECT_KEY_IDENTIFIER`].
pub const AUTHORITY_KEY_ID: &str = "key_id";
/// Issuer certificate serial inside [`AUTHORITY_KEY_IDENTIFIER`], same form
/// as [`SERIAL_NUMBER`].
pub const AUTHORITY_KEY_SERIAL: &str = "serial_number";
/// Basic constraints: a map with [`BASIC_CONSTRAINTS_CA`] and optionally
/// [`BASIC_CONSTRAINTS_PATH_LENGTH`].
pub const BASIC_CONSTRAINTS: &str = "basic_constraints";
pub const BASIC_CONSTRAINTS_CA: &str = "ca";
pub const BASIC_CONSTRAINTS_PATH_LENGTH: &str = "path_length";
/// Key usage flag names (RFC 5280 spelling), present only when the extension is.
pub const KEY_USAGE: &str = "key_usage";
/// Extended key usage purpose names, or dotted OIDs for unrecognized purposes.
pub const EXTENDED_KEY_USAGE: &str = "extended_key_usage";

/// Common name attribute key inside [`SUBJECT_NAME`] / [`ISSUER_NAME`].
pub const COMMON_NAME: &str = "commonName";

pub const KU_DIGITAL_SIGNATURE: &str = "digitalSignature";
pub const KU_KEY_ENCIPHERMENT: &str = "keyEncipherment";
pub const KU_KEY_CERT_SIGN: &str = "keyCertSign";
pub const EKU_SERVER_AUTH: &str = "serverAuth";

const EMAIL_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");

/// Compares two property values for equality.
///
/// The rules are stricter than JSON equality in one direction and looser in
/// another: values of different kinds never compare equal, maps must agree on
/// their entire keyset (both directions) with recursively equal values, arrays
/// must match element-wise in order, and scalars compare by their string
/// representation. These are the exact rules store and issuer lookups rely on.
pub fn value_compare(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Object(lhs), Value::Object(rhs)) => {
            lhs.len() == rhs.len()
                && lhs
                    .iter()
                    .all(|(key, value)| rhs.get(key).is_some_and(|other| value_compare(value, other)))
        }
        (Value::Array(lhs), Value::Array(rhs)) => {
            lhs.len() == rhs.len()
                && lhs
                    .iter()
                    .zip(rhs.iter())
                    .all(|(value, other)| value_compare(value, other))
        }
        (Value::Null, Value::Null) => true,
        (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
        (Value::Number(lhs), Value::Number(rhs)) => lhs.to_string() == rhs.to_string(),
        (Value::String(lhs), Value::String(rhs)) => lhs == rhs,
        _ => false,
    }
}

/// Returns true if `array` contains an element equal to `value` under
/// [`value_compare`].
pub fn array_includes_value(array: &[Value], value: &Value) -> bool {
    array.iter().any(|element| value_compare(element, value))
}

/// Formats bytes as lowercase colon-separated hex, the form used for subject
/// and authority key identifiers.
pub(crate) fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Formats serial number bytes as uppercase hex with all leading zeros
/// stripped; a zero serial formats as `"0"`.
pub(crate) fn serial_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push_str(&format!("{byte:02X}"));
    }
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn decode_time(time: &Time) -> time::OffsetDateTime {
    match time {
        Time::UtcTime(utc) => time::OffsetDateTime::from(utc.to_system_time()),
        Time::GeneralTime(general) => time::OffsetDateTime::from(general.to_system_time()),
    }
}

/// Derives the full property map from a decoded TBS certificate.
///
/// Never fails: fields or extensions that cannot be decoded are logged at
/// debug level and left out of the map, which downstream checks treat as
/// the property being absent.
pub(crate) fn build_info(tbs: &TbsCertificateInner) -> CertInfo {
    let mut info = CertInfo::new();

    info.insert(
        SUBJECT_NAME.to_string(),
        Value::Object(name_map(&tbs.subject)),
    );
    info.insert(
        SUBJECT_NAME_STRING.to_string(),
        Value::String(tbs.subject.to_string()),
    );
    info.insert(
        ISSUER_NAME.to_string(),
        Value::Object(name_map(&tbs.issuer)),
    );
    info.insert(
        ISSUER_NAME_STRING.to_string(),
        Value::String(tbs.issuer.to_string()),
    );
    info.insert(
        SERIAL_NUMBER.to_string(),
        Value::String(serial_hex(tbs.serial_number.as_bytes())),
    );

    let not_before = decode_time(&tbs.validity.not_before);
    let not_after = decode_time(&tbs.validity.not_after);
    match (not_before.format(&Rfc3339), not_after.format(&Rfc3339)) {
        (Ok(from), Ok(to)) => {
            info.insert(VALID_FROM.to_string(), Value::String(from));
            info.insert(VALID_TO.to_string(), Value::String(to));
        }
        (from, to) => {
            debug!(
                "certificate validity outside representable range: {:?} {:?}",
                from.err(),
                to.err()
            );
        }
    }

    extension_info(tbs, &mut info);
    info
}

fn extension_info(tbs: &TbsCertificateInner, info: &mut CertInfo) {
    match find_extension::<SubjectKeyIdentifier>(tbs) {
        Ok(Some(skid)) => {
            info.insert(
                SUBJECT_KEY_IDENTIFIER.to_string(),
                Value::String(hex_colon(&skid.0)),
            );
        }
        Ok(None) => {}
        Err(e) => debug!("could not decode subject key identifier extension: {}", e),
    }

    match find_extension::<AuthorityKeyIdentifier>(tbs) {
        Ok(Some(akid)) => {
            let mut map = Map::new();
            if let Some(key_id) = &akid.key_identifier {
                map.insert(
                    AUTHORITY_KEY_ID.to_string(),
                    Value::String(hex_colon(key_id)),
                );
            }
            if let Some(serial) = &akid.authority_cert_serial_number {
                map.insert(
                    AUTHORITY_KEY_SERIAL.to_string(),
                    Value::String(serial_hex(serial)),
                );
            }
            info.insert(AUTHORITY_KEY_IDENTIFIER.to_string(), Value::Object(map));
        }
        Ok(None) => {}
        Err(e) => debug!("could not decode authority key identifier extension: {}", e),
    }

    match find_extension::<BasicConstraints>(tbs) {
        Ok(Some(bc)) => {
            let mut map = Map::new();
            map.insert(BASIC_CONSTRAINTS_CA.to_string(), Value::Bool(bc.is_ca));
            if let Some(path_length) = bc.max_path_length {
                // A path length on a non-CA certificate carries no meaning;
                // it is recorded as zero.
                let path_length = if bc.is_ca { path_length } else { 0 };
                map.insert(
                    BASIC_CONSTRAINTS_PATH_LENGTH.to_string(),
                    Value::Number(path_length.into()),
                );
            }
            info.insert(BASIC_CONSTRAINTS.to_string(), Value::Object(map));
        }
        Ok(None) => {}
        Err(e) => debug!("could not decode basic constraints extension: {}", e),
    }

    match find_extension::<KeyUsage>(tbs) {
        Ok(Some(ku)) => {
            let names = ku
                .flag_names()
                .into_iter()
                .map(|name| Value::String(name.to_string()))
                .collect();
            info.insert(KEY_USAGE.to_string(), Value::Array(names));
        }
        Ok(None) => {}
        Err(e) => debug!("could not decode key usage extension: {}", e),
    }

    match find_extension::<ExtendedKeyUsage>(tbs) {
        Ok(Some(eku)) => {
            let names = eku
                .purposes
                .iter()
                .map(|purpose| Value::String(purpose.name()))
                .collect();
            info.insert(EXTENDED_KEY_USAGE.to_string(), Value::Array(names));
        }
        Ok(None) => {}
        Err(e) => debug!("could not decode extended key usage extension: {}", e),
    }
}

fn name_map(name: &RdnSequence) -> Map<String, Value> {
    let mut map = Map::new();
    for rdn in name.0.iter() {
        for atav in rdn.0.iter() {
            match attribute_string(&atav.value) {
                Some(value) => {
                    map.insert(attribute_name(&atav.oid), Value::String(value));
                }
                None => debug!(
                    "skipping name attribute {} with unsupported value encoding",
                    atav.oid
                ),
            }
        }
    }
    map
}

/// OpenSSL-style long name for a distinguished-name attribute type, falling
/// back to the dotted OID for unrecognized types.
fn attribute_name(oid: &ObjectIdentifier) -> String {
    match *oid {
        rfc4519::CN => COMMON_NAME.to_string(),
        rfc4519::C => "countryName".to_string(),
        rfc4519::ST => "stateOrProvinceName".to_string(),
        rfc4519::L => "localityName".to_string(),
        rfc4519::O => "organizationName".to_string(),
        rfc4519::OU => "organizationalUnitName".to_string(),
        EMAIL_ADDRESS => "emailAddress".to_string(),
        _ => oid.to_string(),
    }
}

fn attribute_string(value: &der::Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String => Utf8StringRef::try_from(value).ok().map(|s| s.to_string()),
        Tag::PrintableString => PrintableStringRef::try_from(value).ok().map(|s| s.to_string()),
        Tag::Ia5String => Ia5StringRef::try_from(value).ok().map(|s| s.to_string()),
        Tag::TeletexString => TeletexStringRef::try_from(value).ok().map(|s| s.to_string()),
        _ => None,
    }
}
