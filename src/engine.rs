use crate::persistence::aof::AofManager;
use crate::store::SharedKeyspace;
use std::sync::Arc;

/// The owning aggregate: keyspace/TTL manager and AOF manager bound
/// together so a connection handler never reaches through free globals.
#[derive(Clone)]
pub struct Engine {
    pub keyspace: SharedKeyspace,
    pub aof: Arc<AofManager>,
}

impl Engine {
    pub fn new(keyspace: SharedKeyspace, aof: Arc<AofManager>) -> Self {
        Engine { keyspace, aof }
    }
}
