use crate::command::{arg_to_i64, arg_to_string, wrong_arg_count};
use crate::error::EngineError;
use crate::resp::Value;
use crate::store::Keyspace;

pub fn delete(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.len() != 1 {
        return (wrong_arg_count("DELETE"), false);
    }
    let key = match arg_to_string(&args[0]) {
        Some(k) => k,
        None => return (Value::integer(0), false),
    };
    let existed = ks.delete(&key);
    (Value::integer(existed as i64), existed)
}

pub fn flush(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if !args.is_empty() {
        return (wrong_arg_count("FLUSH"), false);
    }
    let count = ks.flush();
    (Value::integer(count as i64), true)
}

fn expire_impl(args: &[Value], ks: &mut Keyspace, cmd: &str, unit_ms: i64) -> (Value, bool) {
    if args.len() != 2 {
        return (wrong_arg_count(cmd), false);
    }
    let key = match arg_to_string(&args[0]) {
        Some(k) => k,
        None => return (Value::integer(0), false),
    };
    let amount = match arg_to_i64(&args[1]) {
        Some(n) => n,
        None => return (Value::error("ERR value is not an integer or out of range"), false),
    };

    if ks.get(&key).is_none() {
        return (Value::integer(0), false);
    }

    if amount == 0 {
        ks.delete(&key);
        return (Value::integer(1), true);
    }

    let ttl_ms = amount.saturating_mul(unit_ms);
    if ks.ttl.set_expiry(&key, ttl_ms) {
        (Value::integer(1), true)
    } else {
        (Value::integer(0), false)
    }
}

pub fn expire(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    expire_impl(args, ks, "EXPIRE", 1000)
}

pub fn pexpire(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    expire_impl(args, ks, "PEXPIRE", 1)
}

fn ttl_impl(args: &[Value], ks: &mut Keyspace, cmd: &str, to_reply_unit: fn(i64) -> i64) -> (Value, bool) {
    if args.len() != 1 {
        return (wrong_arg_count(cmd), false);
    }
    let key = match arg_to_string(&args[0]) {
        Some(k) => k,
        None => return (Value::integer(-2), false),
    };
    if ks.get(&key).is_none() {
        return (Value::integer(-2), false);
    }
    let ms = ks.ttl.get_ttl(&key);
    let reply = if ms < 0 { -1 } else { to_reply_unit(ms) };
    (Value::integer(reply), false)
}

pub fn ttl(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    ttl_impl(args, ks, "TTL", |ms| (ms / 1000).max(1))
}

pub fn pttl(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    ttl_impl(args, ks, "PTTL", |ms| ms)
}

pub fn exists(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.is_empty() {
        return (wrong_arg_count("EXISTS"), false);
    }
    let count = args
        .iter()
        .filter_map(arg_to_string)
        .filter(|k| ks.is_live(k))
        .count();
    (Value::integer(count as i64), false)
}

pub fn keys(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.len() != 1 {
        return (wrong_arg_count("KEYS"), false);
    }
    let pattern = match arg_to_string(&args[0]) {
        Some(p) => p,
        None => return (Value::error("ERR invalid pattern"), false),
    };
    if pattern != "*" {
        return (
            Value::error(EngineError::PatternNotSupported(pattern).to_wire_message()),
            false,
        );
    }
    let keys = ks
        .keys_after_sweep()
        .into_iter()
        .map(|k| Value::bulk_string(k.into_bytes()))
        .collect();
    (Value::array(keys), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bs(s: &str) -> Value {
        Value::bulk_string(s.as_bytes().to_vec())
    }

    #[test]
    fn delete_present_and_absent() {
        let mut ks = Keyspace::new();
        ks.set("k".to_string(), b"v".to_vec());
        let (reply, mutated) = delete(&[bs("k")], &mut ks);
        assert_eq!(reply, Value::integer(1));
        assert!(mutated);

        let (reply, mutated) = delete(&[bs("k")], &mut ks);
        assert_eq!(reply, Value::integer(0));
        assert!(!mutated);
    }

    #[test]
    fn flush_always_logs_even_when_empty() {
        let mut ks = Keyspace::new();
        let (reply, mutated) = flush(&[], &mut ks);
        assert_eq!(reply, Value::integer(0));
        assert!(mutated);
    }

    #[test]
    fn expire_zero_deletes_immediately() {
        let mut ks = Keyspace::new();
        ks.set("k".to_string(), b"v".to_vec());
        let (reply, mutated) = expire(&[bs("k"), Value::bulk_string(b"0".to_vec())], &mut ks);
        assert_eq!(reply, Value::integer(1));
        assert!(mutated);
        assert!(ks.get("k").is_none());
    }

    #[test]
    fn expire_negative_is_rejected() {
        let mut ks = Keyspace::new();
        ks.set("k".to_string(), b"v".to_vec());
        let (reply, mutated) = expire(&[bs("k"), Value::bulk_string(b"-1".to_vec())], &mut ks);
        assert_eq!(reply, Value::integer(0));
        assert!(!mutated);
        assert_eq!(ks.get("k"), Some(b"v".as_slice()));
    }

    #[test]
    fn expire_missing_key_is_zero() {
        let mut ks = Keyspace::new();
        let (reply, mutated) = expire(&[bs("missing"), Value::bulk_string(b"5".to_vec())], &mut ks);
        assert_eq!(reply, Value::integer(0));
        assert!(!mutated);
    }

    #[test]
    fn ttl_reports_sentinels() {
        let mut ks = Keyspace::new();
        let (reply, _) = ttl(&[bs("missing")], &mut ks);
        assert_eq!(reply, Value::integer(-2));

        ks.set("k".to_string(), b"v".to_vec());
        let (reply, _) = ttl(&[bs("k")], &mut ks);
        assert_eq!(reply, Value::integer(-1));

        ks.ttl.set_expiry("k", 500);
        let (reply, _) = ttl(&[bs("k")], &mut ks);
        assert_eq!(reply, Value::integer(1));
    }

    #[test]
    fn exists_does_not_evict_expired_entries() {
        let mut ks = Keyspace::new();
        ks.set("k".to_string(), b"v".to_vec());
        ks.ttl.set_expiry("k", 0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (reply, mutated) = exists(&[bs("k")], &mut ks);
        assert_eq!(reply, Value::integer(0));
        assert!(!mutated);
        assert_eq!(ks.raw_len(), 1);
    }

    #[test]
    fn keys_rejects_non_star_pattern() {
        let mut ks = Keyspace::new();
        let (reply, mutated) = keys(&[bs("a*")], &mut ks);
        assert_eq!(
            reply,
            Value::error("ERR Pattern 'a*' not supported".to_string())
        );
        assert!(!mutated);
    }

    #[test]
    fn keys_sweeps_and_lists_remaining() {
        let mut ks = Keyspace::new();
        ks.set("a".to_string(), b"1".to_vec());
        ks.set("b".to_string(), b"2".to_vec());
        ks.ttl.set_expiry("b", 0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (reply, mutated) = keys(&[bs("*")], &mut ks);
        assert_eq!(reply, Value::array(vec![Value::bulk_string(b"a".to_vec())]));
        assert!(!mutated);
    }
}
