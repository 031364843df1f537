use crate::command::{arg_to_string, wrong_arg_count};
use crate::resp::Value;
use crate::store::Keyspace;

pub fn get(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.len() != 1 {
        return (wrong_arg_count("GET"), false);
    }
    let key = match arg_to_string(&args[0]) {
        Some(k) => k,
        None => return (Value::null_bulk_string(), false),
    };
    let reply = match ks.get(&key) {
        Some(v) => Value::bulk_string(v.to_vec()),
        None => Value::null_bulk_string(),
    };
    (reply, false)
}

pub fn set(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.len() != 2 {
        return (wrong_arg_count("SET"), false);
    }
    let key = match arg_to_string(&args[0]) {
        Some(k) => k,
        None => return (Value::error("ERR invalid key"), false),
    };
    let value = match args[1].as_bytes() {
        Some(v) => v.to_vec(),
        None => return (Value::error("ERR invalid value"), false),
    };
    ks.set(key, value);
    (Value::integer(1), true)
}

pub fn mget(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.is_empty() {
        return (wrong_arg_count("MGET"), false);
    }
    let mut replies = Vec::with_capacity(args.len());
    for arg in args {
        let reply = match arg_to_string(arg).and_then(|k| ks.get(&k).map(|v| v.to_vec())) {
            Some(v) => Value::bulk_string(v),
            None => Value::null_bulk_string(),
        };
        replies.push(reply);
    }
    (Value::array(replies), false)
}

pub fn mset(args: &[Value], ks: &mut Keyspace) -> (Value, bool) {
    if args.len() < 2 {
        return (wrong_arg_count("MSET"), false);
    }
    let mut stored = 0i64;
    for pair in args.chunks(2) {
        if pair.len() < 2 {
            break; // stray trailing single arg is ignored
        }
        let key = match arg_to_string(&pair[0]) {
            Some(k) => k,
            None => continue,
        };
        let value = match pair[1].as_bytes() {
            Some(v) => v.to_vec(),
            None => continue,
        };
        ks.set(key, value);
        stored += 1;
    }
    (Value::integer(stored), true)
}
