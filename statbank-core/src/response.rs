//! Reading the loader's answer.
//!
//! The loader reports success only inside a free-text message. The job number
//! and the publication time are recovered by splitting on the literal anchors
//! below; their punctuation is an external contract covered by the golden
//! message in the tests.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::error::{Result, StatbankError};

pub const JOB_NUMBER_ANCHOR: &str = "lasteoppdragsnummer:";
pub const PUBLISH_DATE_ANCHOR: &str = "Publiseringsdato '";
pub const PUBLISH_TIME_ANCHOR: &str = "Publiseringstid '";
const JOB_NUMBER_END: &str = " =";
const PUBLISH_DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderStatus {
    pub job_number: String,
    pub publish_at: NaiveDateTime,
}

#[derive(Deserialize)]
struct LoaderResponse {
    #[serde(rename = "TotalResult")]
    total_result: TotalResult,
}

#[derive(Deserialize)]
struct TotalResult {
    #[serde(rename = "Message")]
    message: String,
}

/// Pulls `TotalResult.Message` out of a loader response body.
pub fn extract_message(body: &str) -> Result<String> {
    serde_json::from_str::<LoaderResponse>(body)
        .map(|r| r.total_result.message)
        .map_err(|e| StatbankError::protocol_parse(format!("no TotalResult.Message in response: {e}")))
}

/// Parses job number and publication time out of the status message.
pub fn parse_message(message: &str) -> Result<LoaderStatus> {
    let job_number = parse_job_number(message)?;
    let publish_date = after_anchor(message, PUBLISH_DATE_ANCHOR)?;
    let publish_date = publish_date.split('\'').next().unwrap_or_default();
    let date = NaiveDateTime::parse_from_str(publish_date, PUBLISH_DATE_FORMAT).map_err(|e| {
        StatbankError::protocol_parse(format!("publish date '{publish_date}' unreadable: {e}"))
    })?;

    let time = after_anchor(message, PUBLISH_TIME_ANCHOR)?;
    let time = time.split('\'').next().unwrap_or_default();
    let (hour, minute) = time
        .split_once(':')
        .ok_or_else(|| StatbankError::protocol_parse(format!("publish time '{time}' lacks ':'")))?;
    let hour: i64 = hour
        .trim()
        .parse()
        .map_err(|_| StatbankError::protocol_parse(format!("publish hour '{hour}' is not a number")))?;
    let minute: i64 = minute.trim().parse().map_err(|_| {
        StatbankError::protocol_parse(format!("publish minute '{minute}' is not a number"))
    })?;

    let publish_at = TimeDelta::try_hours(hour)
        .zip(TimeDelta::try_minutes(minute))
        .and_then(|(h, m)| date.checked_add_signed(h)?.checked_add_signed(m))
        .ok_or_else(|| {
            StatbankError::protocol_parse(format!("publish time '{time}' is out of range"))
        })?;

    Ok(LoaderStatus {
        job_number,
        publish_at,
    })
}

/// Body of a 200 response straight to a [`LoaderStatus`].
pub fn parse_response(body: &str) -> Result<LoaderStatus> {
    parse_message(&extract_message(body)?)
}

fn parse_job_number(message: &str) -> Result<String> {
    let rest = after_anchor(message, JOB_NUMBER_ANCHOR)?;
    let token = match rest.find(JOB_NUMBER_END) {
        Some(end) => &rest[..end],
        None => rest.split_whitespace().next().unwrap_or_default(),
    };
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(StatbankError::protocol_parse(format!(
            "job number '{token}' is not purely numeric"
        )));
    }
    Ok(token.to_string())
}

fn after_anchor<'a>(message: &'a str, anchor: &str) -> Result<&'a str> {
    message
        .split_once(anchor)
        .map(|(_, rest)| rest)
        .ok_or_else(|| StatbankError::protocol_parse(format!("anchor \"{anchor}\" not found in message")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const GOLDEN: &str = "Lasteoppdraget er lagt i kø. lasteoppdragsnummer:197885 = \
        HovedTabellNavn. Publiseringsdato '07.01.2023 00:00:00', \
        Publiseringstid '08:00', Auto godkjenning av data '2'";

    fn expected_publish() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 7)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn golden_message() {
        let status = parse_message(GOLDEN).unwrap();
        assert_eq!(status.job_number, "197885");
        assert_eq!(status.publish_at, expected_publish());
    }

    #[test]
    fn elided_sample_message() {
        let sample = "...lasteoppdragsnummer:197885 ... Publiseringsdato '07.01.2023 00:00:00', ... Publiseringstid '08:00'...";
        let status = parse_message(sample).unwrap();
        assert_eq!(status.job_number, "197885");
        assert_eq!(status.publish_at, expected_publish());
    }

    #[test]
    fn full_response_body() {
        let body = serde_json::json!({"TotalResult": {"Message": GOLDEN, "Status": "Success"}}).to_string();
        assert_eq!(parse_response(&body).unwrap().job_number, "197885");
    }

    #[test]
    fn minutes_are_added() {
        let msg = "lasteoppdragsnummer:1 = x Publiseringsdato '31.12.2023 00:00:00', Publiseringstid '23:45'";
        let status = parse_message(msg).unwrap();
        assert_eq!(
            status.publish_at,
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(23, 45, 0).unwrap()
        );
    }

    #[test]
    fn absurd_publish_time_is_a_parse_error() {
        for time in ["99999999999:00", "9999999999:00", "08:99999999999999999"] {
            let msg = format!(
                "lasteoppdragsnummer:1 = x Publiseringsdato '07.01.2023 00:00:00', Publiseringstid '{time}'"
            );
            assert!(matches!(
                parse_message(&msg),
                Err(StatbankError::ProtocolParse(_))
            ));
        }
    }

    #[test]
    fn missing_anchors_are_parse_errors() {
        for msg in [
            "Publiseringsdato '07.01.2023 00:00:00', Publiseringstid '08:00'",
            "lasteoppdragsnummer:197885 = Publiseringstid '08:00'",
            "lasteoppdragsnummer:197885 = Publiseringsdato '07.01.2023 00:00:00',",
        ] {
            assert!(matches!(
                parse_message(msg),
                Err(StatbankError::ProtocolParse(_))
            ));
        }
    }

    #[test]
    fn non_numeric_job_number_is_rejected() {
        let msg = "lasteoppdragsnummer:19A885 = Publiseringsdato '07.01.2023 00:00:00', Publiseringstid '08:00'";
        assert!(matches!(parse_message(msg), Err(StatbankError::ProtocolParse(_))));
    }

    #[test]
    fn body_without_message_is_a_parse_error() {
        assert!(matches!(
            extract_message("{\"Status\": \"ok\"}"),
            Err(StatbankError::ProtocolParse(_))
        ));
    }
}
