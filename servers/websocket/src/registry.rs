use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::{DashMap, DashSet};
use tungstenite::protocol::frame::coding::CloseCode;
use uuid::Uuid;

use crate::{
    config::WebSocketServerConfig,
    errors::{RegistryError, RegistryResult},
    session::Session,
    template::PathTemplate,
};

const ENDED_SESSION_REASON: &str = "Authenticated HTTP session that has ended";

/// Frames leaving an endpoint pass through its encoders; the registry only
/// needs to prove each one can be constructed.
pub trait MessageEncoder: Send {
    fn encode(&mut self, message: &[u8], out: &mut Vec<u8>) -> Result<(), String>;
}

pub type EncoderFactory = Arc<dyn Fn() -> Result<Box<dyn MessageEncoder>, String> + Send + Sync>;

pub struct EndpointConfig {
    pub path: String,
    pub subprotocols: Vec<String>,
    pub encoders: Vec<EncoderFactory>,
    /// Per-endpoint buffer overrides; the server config fills the gaps.
    pub binary_buffer_size: Option<usize>,
    pub text_buffer_size: Option<usize>,
}

impl EndpointConfig {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            subprotocols: Vec::new(),
            encoders: Vec::new(),
            binary_buffer_size: None,
            text_buffer_size: None,
        }
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("path", &self.path)
            .field("subprotocols", &self.subprotocols)
            .field("encoders", &self.encoders.len())
            .finish()
    }
}

type TemplateBucket = Arc<RwLock<BTreeMap<String, (PathTemplate, Arc<EndpointConfig>)>>>;

/// Concurrent mapping of request path to endpoint. Exact paths win over
/// templates; templates compete within their segment-count bucket in
/// normalized lexicographic order, first match taken. Request handling
/// threads look up and register sessions while deployment threads are still
/// inserting endpoints.
pub struct EndpointRegistry {
    config: WebSocketServerConfig,
    exact: DashMap<String, Arc<EndpointConfig>>,
    templated: DashMap<usize, TemplateBucket>,
    registered_paths: DashSet<String>,
    add_allowed: AtomicBool,
    sessions: DashMap<Uuid, Session>,
    authenticated_sessions: DashMap<String, Vec<Session>>,
}

impl EndpointRegistry {
    pub fn new(config: WebSocketServerConfig) -> Self {
        Self {
            config,
            exact: DashMap::new(),
            templated: DashMap::new(),
            registered_paths: DashSet::new(),
            add_allowed: AtomicBool::new(true),
            sessions: DashMap::new(),
            authenticated_sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &WebSocketServerConfig {
        &self.config
    }

    /// Register an endpoint. Fails once lookups have started (when the
    /// server enforces that), on a pathless endpoint, on an encoder that
    /// cannot be constructed, and on any duplicate path or template shape.
    pub fn add_endpoint(&self, config: EndpointConfig) -> RegistryResult<()> {
        if self.config.enforce_no_add_after_handshake && !self.add_allowed.load(Ordering::Acquire)
        {
            return Err(RegistryError::AddNotAllowed);
        }
        if config.path.is_empty() {
            return Err(RegistryError::MissingAnnotation);
        }
        for factory in &config.encoders {
            factory().map_err(|reason| RegistryError::EncoderInvalid {
                endpoint: config.path.clone(),
                reason,
            })?;
        }

        let template = PathTemplate::parse(&config.path);
        if template.has_parameters() {
            // put-if-absent so two deployers racing on a new segment count
            // end up sharing one ordered bucket
            let bucket = self
                .templated
                .entry(template.segment_count())
                .or_default()
                .value()
                .clone();
            let mut guard = bucket.write().expect("template bucket lock poisoned");
            if guard.contains_key(template.normalized())
                || !self.registered_paths.insert(config.path.clone())
            {
                return Err(RegistryError::DuplicatePath(config.path));
            }
            tracing::info!("endpoint registered for template {}", config.path);
            guard.insert(
                template.normalized().to_string(),
                (template, Arc::new(config)),
            );
        } else {
            match self.exact.entry(config.path.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    return Err(RegistryError::DuplicatePath(config.path));
                }
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    self.registered_paths.insert(config.path.clone());
                    tracing::info!("endpoint registered for path {}", config.path);
                    entry.insert(Arc::new(config));
                }
            }
        }
        Ok(())
    }

    /// Resolve a request path to its endpoint and any template bindings.
    /// The first lookup permanently drops the registration latch.
    pub fn find_mapping(
        &self,
        path: &str,
    ) -> Option<(Arc<EndpointConfig>, HashMap<String, String>)> {
        // one-way and idempotent
        self.add_allowed.store(false, Ordering::Release);

        if let Some(config) = self.exact.get(path) {
            return Some((config.value().clone(), HashMap::new()));
        }

        let request = PathTemplate::parse(path);
        let bucket = self
            .templated
            .get(&request.segment_count())?
            .value()
            .clone();
        let guard = bucket.read().expect("template bucket lock poisoned");
        for (template, config) in guard.values() {
            if let Some(bindings) = template.bind(path) {
                return Some((config.clone(), bindings));
            }
        }
        None
    }

    pub fn is_path_registered(&self, path: &str) -> bool {
        self.registered_paths.contains(path)
    }

    pub fn register_session(&self, session: Session) {
        if session.is_authenticated() {
            let http_session_id = session
                .http_session_id()
                .expect("authenticated implies an http session id")
                .to_string();
            self.authenticated_sessions
                .entry(http_session_id)
                .or_default()
                .push(session.clone());
        }
        self.sessions.insert(session.id(), session);
    }

    pub fn unregister_session(&self, session: &Session) {
        self.sessions.remove(&session.id());
        if let Some(http_session_id) = session.http_session_id() {
            if let Some(mut bucket) = self.authenticated_sessions.get_mut(http_session_id) {
                bucket.retain(|candidate| candidate.id() != session.id());
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The backing HTTP session ended: atomically detach its bucket, then
    /// close every session in it. The remove happens first so concurrent
    /// register/unregister calls observe a disjoint state, and no map entry
    /// is held while the closes go out.
    pub fn close_authenticated_sessions(&self, http_session_id: &str) {
        let Some((_, sessions)) = self.authenticated_sessions.remove(http_session_id) else {
            return;
        };
        tracing::info!(
            "closing {} sessions of ended http session {}",
            sessions.len(),
            http_session_id
        );
        for session in sessions {
            self.sessions.remove(&session.id());
            session.close(CloseCode::Policy, ENDED_SESSION_REASON);
        }
    }
}
