use crate::persistence::aof::FsyncPolicy;

/// Constructor-time configuration. No runtime reload: values are fixed
/// once the server starts accepting connections.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_clients: usize,
    pub aof_file: String,
    pub fsync_policy: FsyncPolicy,
    pub loglevel: String,
    pub hz: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 31337,
            max_clients: 64,
            aof_file: "redis_clone.aof".to_string(),
            fsync_policy: FsyncPolicy::Everysec,
            loglevel: "info".to_string(),
            hz: 10,
        }
    }
}

impl Config {
    /// Layer environment variables over the defaults, then CLI args over
    /// those. `REDIS_CLONE_HOST`, `REDIS_CLONE_PORT`, `REDIS_CLONE_MAX_CLIENTS`,
    /// `REDIS_CLONE_AOF_FILE`, `REDIS_CLONE_FSYNC_POLICY`, `REDIS_CLONE_LOGLEVEL`.
    pub fn load(args: &[String]) -> Self {
        let mut config = Config::default();
        config.apply_env();
        config.apply_args(args);
        config
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("REDIS_CLONE_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("REDIS_CLONE_PORT")
            && let Ok(p) = v.parse()
        {
            self.port = p;
        }
        if let Ok(v) = std::env::var("REDIS_CLONE_MAX_CLIENTS")
            && let Ok(n) = v.parse()
        {
            self.max_clients = n;
        }
        if let Ok(v) = std::env::var("REDIS_CLONE_AOF_FILE") {
            self.aof_file = v;
        }
        if let Ok(v) = std::env::var("REDIS_CLONE_FSYNC_POLICY")
            && let Some(policy) = FsyncPolicy::parse(&v)
        {
            self.fsync_policy = policy;
        }
        if let Ok(v) = std::env::var("REDIS_CLONE_LOGLEVEL") {
            self.loglevel = v;
        }
    }

    fn apply_args(&mut self, args: &[String]) {
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    if i + 1 < args.len() {
                        self.host = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--port" => {
                    if i + 1 < args.len() {
                        if let Ok(p) = args[i + 1].parse() {
                            self.port = p;
                        }
                        i += 1;
                    }
                }
                "--max-clients" => {
                    if i + 1 < args.len() {
                        if let Ok(n) = args[i + 1].parse() {
                            self.max_clients = n;
                        }
                        i += 1;
                    }
                }
                "--aof-file" => {
                    if i + 1 < args.len() {
                        self.aof_file = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--fsync-policy" => {
                    if i + 1 < args.len() {
                        if let Some(policy) = FsyncPolicy::parse(&args[i + 1]) {
                            self.fsync_policy = policy;
                        }
                        i += 1;
                    }
                }
                "--loglevel" => {
                    if i + 1 < args.len() {
                        self.loglevel = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--hz" => {
                    if i + 1 < args.len() {
                        if let Ok(h) = args[i + 1].parse() {
                            self.hz = h;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }
}
