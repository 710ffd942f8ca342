use std::{fmt, panic::Location};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer as _};
use serde_json::Value;
use crate::{
    config::{EncoderKeys, Encoding},
    severity::Severity,
};

/// A single log event as handed to an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub level: Severity,
    pub caller: Option<Caller<'a>>,
    pub message: &'a str,
    pub fields: &'a [(&'a str, &'a Value)],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl<'a> Caller<'a> {
    /// Keeps only the last directory and the file name, e.g. `src/logger.rs`.
    pub fn trimmed_file(&self) -> &'a str {
        let is_separator = |c: char| c == '/' || c == '\\';
        let file = self.file;
        let Some(last) = file.rfind(is_separator) else {
            return file;
        };
        match file[..last].rfind(is_separator) {
            Some(previous) => &file[previous + 1..],
            None => file,
        }
    }
}

impl From<&'static Location<'static>> for Caller<'static> {
    fn from(location: &'static Location<'static>) -> Self {
        Caller {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Caller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.trimmed_file(), self.line)
    }
}

/// ISO-8601 in UTC, truncated to milliseconds, e.g. `2077-01-23T10:15:13.000Z`.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub(crate) struct Encoder {
    encoding: Encoding,
    keys: EncoderKeys,
}

impl Encoder {
    pub(crate) fn new(encoding: Encoding, keys: EncoderKeys) -> Self {
        Self { encoding, keys }
    }

    pub(crate) fn has_stacktrace_key(&self) -> bool {
        self.keys.stacktrace.is_some()
    }

    /// Encodes a record as one newline terminated line. In console encoding a
    /// stack trace follows on its own lines.
    pub(crate) fn encode(
        &self,
        time: DateTime<Utc>,
        record: &Record<'_>,
        fields: &[(&str, &Value)],
        stacktrace: Option<&str>,
    ) -> serde_json::Result<Vec<u8>> {
        let stacktrace = stacktrace.filter(|_| self.has_stacktrace_key());
        let mut buf = Vec::with_capacity(256);
        match self.encoding {
            Encoding::Json => self.encode_json(&mut buf, time, record, fields, stacktrace)?,
            Encoding::Console => {
                self.encode_console(&mut buf, time, record, fields)?;
                if let Some(stacktrace) = stacktrace {
                    buf.push(b'\n');
                    buf.extend_from_slice(stacktrace.trim_end().as_bytes());
                }
            }
        }
        buf.push(b'\n');
        Ok(buf)
    }

    fn encode_json(
        &self,
        buf: &mut Vec<u8>,
        time: DateTime<Utc>,
        record: &Record<'_>,
        fields: &[(&str, &Value)],
        stacktrace: Option<&str>,
    ) -> serde_json::Result<()> {
        let mut serializer = serde_json::Serializer::new(buf);
        let mut map = serializer.serialize_map(None)?;
        if let Some(key) = &self.keys.level {
            map.serialize_entry(key.as_ref(), record.level.as_str())?;
        }
        if let Some(key) = &self.keys.time {
            map.serialize_entry(key.as_ref(), &format_timestamp(time))?;
        }
        if let (Some(key), Some(caller)) = (&self.keys.caller, &record.caller) {
            map.serialize_entry(key.as_ref(), &caller.to_string())?;
        }
        if let Some(key) = &self.keys.message {
            map.serialize_entry(key.as_ref(), record.message)?;
        }
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        if let (Some(key), Some(stacktrace)) = (&self.keys.stacktrace, stacktrace) {
            map.serialize_entry(key.as_ref(), stacktrace)?;
        }
        map.end()
    }

    fn encode_console(
        &self,
        buf: &mut Vec<u8>,
        time: DateTime<Utc>,
        record: &Record<'_>,
        fields: &[(&str, &Value)],
    ) -> serde_json::Result<()> {
        let mut elements = Vec::with_capacity(4);
        if self.keys.time.is_some() {
            elements.push(format_timestamp(time));
        }
        if self.keys.level.is_some() {
            elements.push(record.level.as_str().to_string());
        }
        if let (Some(_), Some(caller)) = (&self.keys.caller, &record.caller) {
            elements.push(caller.to_string());
        }
        if self.keys.message.is_some() {
            elements.push(record.message.to_string());
        }
        buf.extend_from_slice(elements.join("\t").as_bytes());

        if !fields.is_empty() {
            if !elements.is_empty() {
                buf.push(b'\t');
            }
            let mut serializer = serde_json::Serializer::new(&mut *buf);
            let mut map = serializer.serialize_map(Some(fields.len()))?;
            for (key, value) in fields {
                map.serialize_entry(key, value)?;
            }
            map.end()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};
    use serde_json::{json, Value};
    use super::{format_timestamp, Caller, Encoder, Record};
    use crate::{
        config::{Encoding, CONSOLE_CONFIG, SERVER_CONFIG},
        severity::Severity,
    };

    fn record<'a>(message: &'a str, fields: &'a [(&'a str, &'a Value)]) -> Record<'a> {
        Record {
            level: Severity::Info,
            caller: Some(Caller {
                file: "/home/dev/project/src/handler.rs",
                line: 17,
            }),
            message,
            fields,
        }
    }

    fn encode(encoding: Encoding, record: &Record<'_>) -> String {
        let keys = match encoding {
            Encoding::Json => SERVER_CONFIG.keys.clone(),
            Encoding::Console => CONSOLE_CONFIG.keys.clone(),
        };
        let time = Utc.with_ymd_and_hms(2077, 1, 23, 10, 15, 13).unwrap();
        let line = Encoder::new(encoding, keys)
            .encode(time, record, record.fields, None)
            .unwrap();
        String::from_utf8(line).unwrap()
    }

    #[test]
    fn test_trimmed_file() {
        let trimmed = |file: &'static str| Caller { file, line: 1 }.trimmed_file();
        assert_eq!(trimmed("/a/b/c.rs"), "b/c.rs");
        assert_eq!(trimmed("b/c.rs"), "b/c.rs");
        assert_eq!(trimmed("c.rs"), "c.rs");
        assert_eq!(trimmed("C:\\work\\src\\lib.rs"), "src\\lib.rs");
        assert_eq!(
            Caller {
                file: "crates/app/src/main.rs",
                line: 42
            }
            .to_string(),
            "src/main.rs:42"
        );
    }

    #[test]
    fn test_format_timestamp_truncates_to_millis() {
        let time = Utc
            .with_ymd_and_hms(2077, 1, 23, 10, 15, 13)
            .unwrap()
            .with_nanosecond(441)
            .unwrap();
        assert_eq!(format_timestamp(time), "2077-01-23T10:15:13.000Z");

        let time = time.with_nanosecond(987_654_321).unwrap();
        assert_eq!(format_timestamp(time), "2077-01-23T10:15:13.987Z");
    }

    #[test]
    fn test_json_line() {
        let user = json!("ada");
        let attempt = json!(3);
        let fields = [("user", &user), ("attempt", &attempt)];
        assert_eq!(
            encode(Encoding::Json, &record("hello", &fields)),
            "{\"level\":\"INFO\",\"@timestamp\":\"2077-01-23T10:15:13.000Z\",\
             \"caller\":\"src/handler.rs:17\",\"message\":\"hello\",\
             \"user\":\"ada\",\"attempt\":3}\n"
        );
    }

    #[test]
    fn test_json_escapes_message() {
        let line = encode(Encoding::Json, &record("say \"hi\"\n", &[]));
        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["message"], "say \"hi\"\n");
    }

    #[test]
    fn test_console_line() {
        assert_eq!(
            encode(Encoding::Console, &record("hello", &[])),
            "2077-01-23T10:15:13.000Z\tINFO\tsrc/handler.rs:17\thello\n"
        );

        let user = json!("ada");
        let fields = [("user", &user)];
        assert_eq!(
            encode(Encoding::Console, &record("hello", &fields)),
            "2077-01-23T10:15:13.000Z\tINFO\tsrc/handler.rs:17\thello\t{\"user\":\"ada\"}\n"
        );
    }

    #[test]
    fn test_missing_keys_drop_elements() {
        let mut keys = SERVER_CONFIG.keys.clone();
        keys.time = None;
        keys.caller = None;
        let time = Utc.with_ymd_and_hms(2077, 1, 23, 10, 15, 13).unwrap();

        let line = Encoder::new(Encoding::Json, keys.clone())
            .encode(time, &record("hello", &[]), &[], None)
            .unwrap();
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "{\"level\":\"INFO\",\"message\":\"hello\"}\n"
        );

        let line = Encoder::new(Encoding::Console, keys)
            .encode(time, &record("hello", &[]), &[], None)
            .unwrap();
        assert_eq!(String::from_utf8(line).unwrap(), "INFO\thello\n");
    }

    #[test]
    fn test_record_without_caller() {
        let mut record = record("hello", &[]);
        record.caller = None;
        assert_eq!(
            encode(Encoding::Console, &record),
            "2077-01-23T10:15:13.000Z\tINFO\thello\n"
        );
    }

    #[test]
    fn test_severity_names() {
        let mut record = record("hello", &[]);
        record.level = Severity::DPanic;
        assert!(encode(Encoding::Json, &record).starts_with("{\"level\":\"DPANIC\","));
        record.level = Severity::Fatal;
        assert!(encode(Encoding::Console, &record).contains("\tFATAL\t"));
    }

    #[test]
    fn test_stacktrace_follows_console_line() {
        let time = Utc.with_ymd_and_hms(2077, 1, 23, 10, 15, 13).unwrap();
        let line = Encoder::new(Encoding::Console, CONSOLE_CONFIG.keys.clone())
            .encode(time, &record("hello", &[]), &[], Some("frame one\nframe two\n"))
            .unwrap();
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "2077-01-23T10:15:13.000Z\tINFO\tsrc/handler.rs:17\thello\nframe one\nframe two\n"
        );
    }

    #[test]
    fn test_stacktrace_dropped_without_key() {
        let time = Utc.with_ymd_and_hms(2077, 1, 23, 10, 15, 13).unwrap();
        let line = Encoder::new(Encoding::Json, SERVER_CONFIG.keys.clone())
            .encode(time, &record("hello", &[]), &[], Some("frame one"))
            .unwrap();
        assert!(!String::from_utf8(line).unwrap().contains("frame one"));

        let mut keys = SERVER_CONFIG.keys.clone();
        keys.stacktrace = Some("stacktrace".into());
        let line = Encoder::new(Encoding::Json, keys)
            .encode(time, &record("hello", &[]), &[], Some("frame one"))
            .unwrap();
        assert!(String::from_utf8(line)
            .unwrap()
            .ends_with(",\"stacktrace\":\"frame one\"}\n"));
    }
}
