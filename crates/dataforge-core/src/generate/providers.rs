use std::borrow::Cow;
use std::fmt;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use fake::faker::address::en::*;
use fake::faker::company::en::*;
use fake::faker::internet::en::*;
use fake::faker::lorem::en::*;
use fake::faker::name::en::*;
use fake::faker::phone_number::en::*;
use fake::Fake;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::generate::value::Value;

/// Wrap a dynamically generated String into a Value::String.
#[inline]
fn owned(s: String) -> Value {
    Value::String(Cow::Owned(s))
}

/// Wrap a static string literal into a Value::String (zero heap allocation).
#[inline]
fn borrowed(s: &'static str) -> Value {
    Value::String(Cow::Borrowed(s))
}

/// Named fake-data providers a rule can draw from.
///
/// Temporal values are offsets from a fixed anchor date, so the same seed
/// produces the same rows no matter when the pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FakeKind {
    // Identity
    FirstName,
    LastName,
    Name,
    Username,
    Gender,
    Password,

    // Contact
    #[serde(alias = "email")]
    SafeEmail,
    Phone,

    // Address
    Address,
    City,
    State,
    Country,
    Zipcode,

    // Company
    Company,
    JobTitle,

    // Internet
    Url,
    Ipv4,
    Ipv6,
    UserAgent,

    // Content
    Word,
    Sentence,
    Paragraph,

    // Plain typed values
    Integer,
    SmallInt,
    BigInt,
    Boolean,
    Float,
    Decimal,
    Date,
    Time,
    Datetime,
    Uuid,
    Json,
    Bytes,
}

fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

impl FakeKind {
    pub fn generate(self, rng: &mut impl Rng) -> Value {
        match self {
            FakeKind::FirstName => owned(FirstName().fake_with_rng(rng)),
            FakeKind::LastName => owned(LastName().fake_with_rng(rng)),
            FakeKind::Name => owned(Name().fake_with_rng(rng)),
            FakeKind::Username => owned(Username().fake_with_rng(rng)),
            FakeKind::Gender => {
                let genders = ["Male", "Female"];
                borrowed(genders[rng.random_range(0..genders.len())])
            }
            FakeKind::Password => owned(Password(10..20).fake_with_rng(rng)),

            FakeKind::SafeEmail => owned(SafeEmail().fake_with_rng(rng)),
            FakeKind::Phone => owned(PhoneNumber().fake_with_rng(rng)),

            FakeKind::Address => {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                let suffix: String = StreetSuffix().fake_with_rng(rng);
                owned(format!("{} {} {}", number, street, suffix))
            }
            FakeKind::City => owned(CityName().fake_with_rng(rng)),
            FakeKind::State => owned(StateName().fake_with_rng(rng)),
            FakeKind::Country => owned(CountryName().fake_with_rng(rng)),
            FakeKind::Zipcode => owned(ZipCode().fake_with_rng(rng)),

            FakeKind::Company => owned(CompanyName().fake_with_rng(rng)),
            FakeKind::JobTitle => owned(Profession().fake_with_rng(rng)),

            FakeKind::Url => {
                let word: String = Word().fake_with_rng(rng);
                let domain: String = DomainSuffix().fake_with_rng(rng);
                owned(format!("https://www.{}.{}/", word.to_lowercase(), domain))
            }
            FakeKind::Ipv4 => owned(IPv4().fake_with_rng(rng)),
            FakeKind::Ipv6 => owned(IPv6().fake_with_rng(rng)),
            FakeKind::UserAgent => owned(UserAgent().fake_with_rng(rng)),

            FakeKind::Word => {
                let word: String = Word().fake_with_rng(rng);
                owned(capitalize(&word))
            }
            FakeKind::Sentence => owned(Sentence(4..10).fake_with_rng(rng)),
            FakeKind::Paragraph => owned(Paragraph(2..5).fake_with_rng(rng)),

            FakeKind::Integer => Value::Int(rng.random_range(0..=100)),
            FakeKind::SmallInt => Value::Int(rng.random_range(0..=32_767)),
            FakeKind::BigInt => Value::Int(rng.random_range(0..=i64::MAX)),
            FakeKind::Boolean => Value::Bool(rng.random_bool(0.5)),
            FakeKind::Float => {
                let val: f64 = rng.random_range(1.0_f64..10.0_f64);
                Value::Float((val * 100.0_f64).round() / 100.0_f64)
            }
            FakeKind::Decimal => {
                let cents: i64 = rng.random_range(0..100_000);
                Value::Float(cents as f64 / 100.0)
            }
            FakeKind::Date => {
                let offset = rng.random_range(-3650..365);
                Value::Date(anchor_date() + ChronoDuration::days(offset))
            }
            FakeKind::Time => Value::Time(random_time(rng)),
            FakeKind::Datetime => {
                let offset = rng.random_range(-3650..365);
                let date = anchor_date() + ChronoDuration::days(offset);
                Value::Timestamp(date.and_time(random_time(rng)))
            }
            FakeKind::Uuid => {
                let bytes: [u8; 16] = rng.random();
                Value::Uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }
            FakeKind::Json => {
                let name: String = Name().fake_with_rng(rng);
                let email: String = SafeEmail().fake_with_rng(rng);
                let city: String = CityName().fake_with_rng(rng);
                Value::Json(serde_json::json!({
                    "name": name,
                    "mail": email,
                    "city": city,
                }))
            }
            FakeKind::Bytes => {
                let bytes: [u8; 10] = rng.random();
                Value::Bytes(bytes.to_vec())
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FakeKind::FirstName => "first_name",
            FakeKind::LastName => "last_name",
            FakeKind::Name => "name",
            FakeKind::Username => "username",
            FakeKind::Gender => "gender",
            FakeKind::Password => "password",
            FakeKind::SafeEmail => "safe_email",
            FakeKind::Phone => "phone",
            FakeKind::Address => "address",
            FakeKind::City => "city",
            FakeKind::State => "state",
            FakeKind::Country => "country",
            FakeKind::Zipcode => "zipcode",
            FakeKind::Company => "company",
            FakeKind::JobTitle => "job_title",
            FakeKind::Url => "url",
            FakeKind::Ipv4 => "ipv4",
            FakeKind::Ipv6 => "ipv6",
            FakeKind::UserAgent => "user_agent",
            FakeKind::Word => "word",
            FakeKind::Sentence => "sentence",
            FakeKind::Paragraph => "paragraph",
            FakeKind::Integer => "integer",
            FakeKind::SmallInt => "small_int",
            FakeKind::BigInt => "big_int",
            FakeKind::Boolean => "boolean",
            FakeKind::Float => "float",
            FakeKind::Decimal => "decimal",
            FakeKind::Date => "date",
            FakeKind::Time => "time",
            FakeKind::Datetime => "datetime",
            FakeKind::Uuid => "uuid",
            FakeKind::Json => "json",
            FakeKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for FakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn random_time(rng: &mut impl Rng) -> NaiveTime {
    let hour = rng.random_range(0..24);
    let min = rng.random_range(0..60);
    let sec = rng.random_range(0..60);
    NaiveTime::from_hms_opt(hour, min, sec).unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().to_string() + chars.as_str(),
    }
}

/// Pick one of `values`, honoring non-negative weights when given.
///
/// All-zero weights fall back to a uniform pick.
pub fn weighted_pick<'a, T>(
    values: &'a [T],
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
) -> Option<&'a T> {
    if values.is_empty() {
        return None;
    }
    let Some(weights) = weights else {
        return values.get(rng.random_range(0..values.len()));
    };

    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if total <= 0.0 {
        return values.get(rng.random_range(0..values.len()));
    }

    let roll: f64 = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in clamped.iter().enumerate() {
        cumulative += w;
        if roll < cumulative {
            return values.get(i);
        }
    }

    // Floating-point edge case
    values.last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_email() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = FakeKind::SafeEmail.generate(&mut rng);
        assert!(value.as_string().unwrap().contains('@'));
    }

    #[test]
    fn test_typed_kinds_produce_typed_values() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(FakeKind::Uuid.generate(&mut rng), Value::Uuid(_)));
        assert!(matches!(FakeKind::Boolean.generate(&mut rng), Value::Bool(_)));
        assert!(matches!(FakeKind::Date.generate(&mut rng), Value::Date(_)));
        match FakeKind::Integer.generate(&mut rng) {
            Value::Int(i) => assert!((0..=100).contains(&i)),
            other => panic!("expected int, got {:?}", other),
        }
    }

    #[test]
    fn test_same_seed_same_values() {
        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        for kind in [FakeKind::Datetime, FakeKind::Uuid, FakeKind::Address] {
            assert_eq!(kind.generate(&mut rng1), kind.generate(&mut rng2));
        }
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let values = ["never", "always"];
        for _ in 0..50 {
            let picked = weighted_pick(&values, Some(&[0.0, 1.0]), &mut rng);
            assert_eq!(picked, Some(&"always"));
        }
        let empty: [&str; 0] = [];
        assert_eq!(weighted_pick(&empty, None, &mut rng), None);
    }

    #[test]
    fn test_kind_names_parse_from_config() {
        let kind: FakeKind = serde_json::from_str("\"job_title\"").unwrap();
        assert_eq!(kind, FakeKind::JobTitle);
        let alias: FakeKind = serde_json::from_str("\"email\"").unwrap();
        assert_eq!(alias, FakeKind::SafeEmail);
        assert_eq!(FakeKind::SmallInt.to_string(), "small_int");
    }
}
