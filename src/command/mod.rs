pub mod key;
pub mod string;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::resp::Value;
use crate::store::Keyspace;

/// Dispatch a parsed request to its handler, acquiring the keyspace lock
/// once and holding it across the AOF append so the mutation and the log
/// record land as one atomic step.
pub async fn dispatch(cmd_name: &str, args: &[Value], engine: &Engine) -> Value {
    let handler: fn(&[Value], &mut Keyspace) -> (Value, bool) = match cmd_name {
        "GET" => string::get,
        "SET" => string::set,
        "MGET" => string::mget,
        "MSET" => string::mset,
        "DELETE" => key::delete,
        "FLUSH" => key::flush,
        "EXPIRE" => key::expire,
        "PEXPIRE" => key::pexpire,
        "TTL" => key::ttl,
        "PTTL" => key::pttl,
        "EXISTS" => key::exists,
        "KEYS" => key::keys,
        _ => return Value::error(EngineError::UnknownCommand(cmd_name.to_string()).to_wire_message()),
    };

    let mut ks = engine.keyspace.write().await;
    let (reply, mutated) = handler(args, &mut ks);
    if mutated {
        if let Err(e) = engine.aof.append(cmd_name, args).await {
            let err = EngineError::Io(e);
            tracing::error!("aof append failed for '{cmd_name}': {err}");
            return Value::error(err.to_wire_message());
        }
    }
    reply
}

/// Apply one record recovered from the AOF directly to the keyspace,
/// bypassing the AOF entirely (replayed records must never be re-logged).
pub fn apply_replayed(keyspace: &mut Keyspace, cmd: &str, raw_args: &[Vec<u8>]) {
    let args: Vec<Value> = raw_args.iter().cloned().map(Value::bulk_string).collect();
    let handler: fn(&[Value], &mut Keyspace) -> (Value, bool) = match cmd {
        "GET" => string::get,
        "SET" => string::set,
        "MGET" => string::mget,
        "MSET" => string::mset,
        "DELETE" => key::delete,
        "FLUSH" => key::flush,
        "EXPIRE" => key::expire,
        "PEXPIRE" => key::pexpire,
        "TTL" => key::ttl,
        "PTTL" => key::pttl,
        "EXISTS" => key::exists,
        "KEYS" => key::keys,
        _ => return,
    };
    let _ = handler(&args, keyspace);
}

pub fn arg_to_string(arg: &Value) -> Option<String> {
    arg.to_string_lossy()
}

pub fn arg_to_i64(arg: &Value) -> Option<i64> {
    arg.to_string_lossy()?.parse().ok()
}

pub fn wrong_arg_count(cmd: &str) -> Value {
    Value::error(EngineError::WrongArgCount(cmd.to_string()).to_wire_message())
}
