use bytes::{Buf, BytesMut};
use std::io;

/// A tagged protocol value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// +OK\r\n
    SimpleString(String),
    /// -ERR message\r\n
    Error(String),
    /// :1000\r\n
    Integer(i64),
    /// $6\r\nfoobar\r\n  or  $-1\r\n (null)
    BulkString(Option<Vec<u8>>),
    /// *2\r\n...  or  *-1\r\n (null)
    Array(Option<Vec<Value>>),
    /// %2\r\n...  — count is the number of key/value pairs, so 2n nested frames follow
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn ok() -> Self {
        Value::SimpleString("OK".to_string())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Value::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        Value::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Vec<u8>>) -> Self {
        Value::BulkString(Some(data.into()))
    }

    pub fn null_bulk_string() -> Self {
        Value::BulkString(None)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Some(items))
    }

    /// Serialize this value to wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    /// Write wire bytes into the given buffer.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Value::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Value::Error(s) => {
                buf.push(b'-');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Value::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Value::BulkString(None) => {
                buf.extend_from_slice(b"$-1\r\n");
            }
            Value::BulkString(Some(data)) => {
                buf.push(b'$');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            Value::Array(None) => {
                buf.extend_from_slice(b"*-1\r\n");
            }
            Value::Array(Some(items)) => {
                buf.push(b'*');
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_to(buf);
                }
            }
            Value::Map(pairs) => {
                buf.push(b'%');
                buf.extend_from_slice(pairs.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for (k, v) in pairs {
                    k.write_to(buf);
                    v.write_to(buf);
                }
            }
        }
    }

    /// Try to interpret this value as raw bytes (for command parsing).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::BulkString(Some(data)) => Some(data),
            Value::SimpleString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Convert to a UTF-8 string (lossily), if this is a string-shaped value.
    pub fn to_string_lossy(&self) -> Option<String> {
        self.as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// Streaming frame parser.
///
/// Handles partial reads — call `parse()` repeatedly as data arrives.
/// Returns `Ok(Some(value))` when a complete value is parsed,
/// `Ok(None)` when more data is needed.
pub struct Parser;

impl Parser {
    /// Try to parse a complete value from the buffer.
    /// On success, consumes the parsed bytes from `buf` and returns the value.
    /// Returns `Ok(None)` if the buffer doesn't contain a complete value yet.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        if buf.is_empty() {
            return Ok(None);
        }
        Self::parse_value(buf)
    }

    fn parse_value(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        if buf.is_empty() {
            return Ok(None);
        }

        match buf[0] {
            b'+' => Self::parse_simple_string(buf),
            b'-' => Self::parse_error(buf),
            b':' => Self::parse_integer(buf),
            b'$' => Self::parse_bulk_string(buf),
            b'*' => Self::parse_array(buf),
            b'%' => Self::parse_map(buf),
            other => Err(ProtocolError::InvalidByte(other)),
        }
    }

    fn parse_simple_string(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        if let Some(end) = find_crlf_from(buf, 1) {
            let s = String::from_utf8_lossy(&buf[1..end]).to_string();
            buf.advance(end + 2);
            Ok(Some(Value::SimpleString(s)))
        } else {
            Ok(None)
        }
    }

    fn parse_error(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        if let Some(end) = find_crlf_from(buf, 1) {
            let s = String::from_utf8_lossy(&buf[1..end]).to_string();
            buf.advance(end + 2);
            Ok(Some(Value::Error(s)))
        } else {
            Ok(None)
        }
    }

    fn parse_integer(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        if let Some(end) = find_crlf_from(buf, 1) {
            let s = std::str::from_utf8(&buf[1..end])
                .map_err(|_| ProtocolError::InvalidData("invalid integer encoding".into()))?;
            let n: i64 = s
                .parse()
                .map_err(|_| ProtocolError::InvalidData(format!("invalid integer: {s}")))?;
            buf.advance(end + 2);
            Ok(Some(Value::Integer(n)))
        } else {
            Ok(None)
        }
    }

    fn parse_length(buf: &BytesMut, crlf: usize) -> Result<i64, ProtocolError> {
        let len_str = std::str::from_utf8(&buf[1..crlf])
            .map_err(|_| ProtocolError::InvalidData("invalid length encoding".into()))?;
        len_str
            .parse()
            .map_err(|_| ProtocolError::InvalidData("invalid length".into()))
    }

    fn parse_bulk_string(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        let crlf = match find_crlf_from(buf, 1) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let len = Self::parse_length(buf, crlf)?;

        if len == -1 {
            buf.advance(crlf + 2);
            return Ok(Some(Value::BulkString(None)));
        }
        if len < -1 || len > 512 * 1024 * 1024 {
            return Err(ProtocolError::InvalidData("invalid bulk length".into()));
        }
        let len = len as usize;
        let total_needed = crlf + 2 + len + 2;

        if buf.len() < total_needed {
            return Ok(None);
        }

        let data = buf[crlf + 2..crlf + 2 + len].to_vec();
        if buf[crlf + 2 + len] != b'\r' || buf[crlf + 2 + len + 1] != b'\n' {
            return Err(ProtocolError::InvalidData(
                "missing trailing CRLF after bulk string".into(),
            ));
        }

        buf.advance(total_needed);
        Ok(Some(Value::BulkString(Some(data))))
    }

    fn parse_array(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        let crlf = match find_crlf_from(buf, 1) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let len = Self::parse_length(buf, crlf)?;
        if len == -1 {
            buf.advance(crlf + 2);
            return Ok(Some(Value::Array(None)));
        }
        if len < -1 || len > 1024 * 1024 {
            return Err(ProtocolError::InvalidData("invalid array length".into()));
        }
        let len = len as usize;

        let saved = buf.clone();
        buf.advance(crlf + 2);

        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            match Self::parse_value(buf) {
                Ok(Some(val)) => items.push(val),
                Ok(None) => {
                    *buf = saved;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Some(Value::Array(Some(items))))
    }

    fn parse_map(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        let crlf = match find_crlf_from(buf, 1) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let len = Self::parse_length(buf, crlf)?;
        if len < 0 || len > 1024 * 1024 {
            return Err(ProtocolError::InvalidData("invalid map length".into()));
        }
        let len = len as usize;

        let saved = buf.clone();
        buf.advance(crlf + 2);

        let mut pairs = Vec::with_capacity(len);
        for _ in 0..len {
            let key = match Self::parse_value(buf) {
                Ok(Some(v)) => v,
                Ok(None) => {
                    *buf = saved;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let value = match Self::parse_value(buf) {
                Ok(Some(v)) => v,
                Ok(None) => {
                    *buf = saved;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            pairs.push((key, value));
        }

        Ok(Some(Value::Map(pairs)))
    }
}

/// Find \r\n starting from the given position.
fn find_crlf_from(buf: &[u8], start: usize) -> Option<usize> {
    if buf.len() < start + 2 {
        return None;
    }
    for i in start..buf.len() - 1 {
        if buf[i] == b'\r' && buf[i + 1] == b'\n' {
            return Some(i);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("expected a type tag, got '{}'", *.0 as char)]
    InvalidByte(u8),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_string() {
        let mut buf = BytesMut::from("+OK\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::SimpleString("OK".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn parse_error() {
        let mut buf = BytesMut::from("-ERR unknown command\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::Error("ERR unknown command".to_string()));
    }

    #[test]
    fn parse_integer() {
        let mut buf = BytesMut::from(":1000\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::Integer(1000));

        let mut buf = BytesMut::from(":-42\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::Integer(-42));
    }

    #[test]
    fn parse_bulk_string() {
        let mut buf = BytesMut::from("$6\r\nfoobar\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::BulkString(Some(b"foobar".to_vec())));
    }

    #[test]
    fn parse_bulk_string_with_embedded_crlf() {
        let mut buf = BytesMut::from(&b"$6\r\nfo\r\nar\r\n"[..]);
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::BulkString(Some(b"fo\r\nar".to_vec())));
    }

    #[test]
    fn parse_null_bulk_string() {
        let mut buf = BytesMut::from("$-1\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::BulkString(None));
    }

    #[test]
    fn parse_empty_bulk_string() {
        let mut buf = BytesMut::from("$0\r\n\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::BulkString(Some(vec![])));
    }

    #[test]
    fn parse_array() {
        let mut buf = BytesMut::from("*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(
            result,
            Value::Array(Some(vec![
                Value::BulkString(Some(b"foo".to_vec())),
                Value::BulkString(Some(b"bar".to_vec())),
            ]))
        );
    }

    #[test]
    fn parse_null_array() {
        let mut buf = BytesMut::from("*-1\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::Array(None));
    }

    #[test]
    fn parse_empty_array() {
        let mut buf = BytesMut::from("*0\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(result, Value::Array(Some(vec![])));
    }

    #[test]
    fn parse_map() {
        let mut buf = BytesMut::from("%2\r\n$1\r\na\r\n$1\r\n1\r\n$1\r\nb\r\n$1\r\n2\r\n");
        let result = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(
            result,
            Value::Map(vec![
                (
                    Value::BulkString(Some(b"a".to_vec())),
                    Value::BulkString(Some(b"1".to_vec()))
                ),
                (
                    Value::BulkString(Some(b"b".to_vec())),
                    Value::BulkString(Some(b"2".to_vec()))
                ),
            ])
        );
    }

    #[test]
    fn parse_partial_data() {
        let mut buf = BytesMut::from("$6\r\nfoo");
        let result = Parser::parse(&mut buf).unwrap();
        assert!(result.is_none());
        assert_eq!(&buf[..], b"$6\r\nfoo");
    }

    #[test]
    fn parse_unknown_tag_is_protocol_error() {
        let mut buf = BytesMut::from("@nope\r\n");
        let result = Parser::parse(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidByte(b'@'))));
    }

    #[test]
    fn serialize_round_trip_values() {
        let values = vec![
            Value::SimpleString("OK".to_string()),
            Value::Error("ERR bad".to_string()),
            Value::Integer(-7),
            Value::BulkString(Some(b"hello\r\nworld".to_vec())),
            Value::BulkString(None),
            Value::array(vec![Value::Integer(1), Value::bulk_string(b"x".to_vec())]),
            Value::Array(None),
            Value::Map(vec![(
                Value::bulk_string(b"k".to_vec()),
                Value::bulk_string(b"v".to_vec()),
            )]),
        ];
        for v in values {
            let mut buf = BytesMut::from(&v.serialize()[..]);
            let parsed = Parser::parse(&mut buf).unwrap().unwrap();
            assert_eq!(parsed, v);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn multiple_values_in_buffer() {
        let mut buf = BytesMut::from("+OK\r\n+PONG\r\n");
        let r1 = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(r1, Value::SimpleString("OK".to_string()));
        let r2 = Parser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(r2, Value::SimpleString("PONG".to_string()));
        assert!(buf.is_empty());
    }
}
