use crate::{
    query::NoQuery,
    selector::{RandomSource, ThreadRandom},
    store::InMemoryStore,
    AnalyticsSink, Client, Experiments, KeyValueStore, QuerySource,
};

/// Configuration for [`Client`].
///
/// # Examples
/// ```
/// # use ab_segment::{ClientConfig, Experiments, TrackEvent};
/// let experiments = Experiments::from_json_str(r#"[{ "name": "hero", "variants": [1, 1] }]"#)
///     .unwrap();
/// let client = ClientConfig::from_experiments(experiments)
///     .analytics(|event: TrackEvent| {
///         println!("{:?}", event);
///     })
///     .to_client();
/// ```
pub struct ClientConfig<'a> {
    pub(crate) experiments: Experiments,
    pub(crate) store: Box<dyn KeyValueStore + Send + Sync + 'a>,
    pub(crate) query: Box<dyn QuerySource + Send + Sync + 'a>,
    pub(crate) analytics: Option<Box<dyn AnalyticsSink + Send + Sync + 'a>>,
    pub(crate) random: Box<dyn RandomSource + Send + Sync + 'a>,
    pub(crate) event_name: String,
}

impl<'a> ClientConfig<'a> {
    /// Create a default configuration for the given experiment definitions.
    ///
    /// Assignments are kept in an [`InMemoryStore`], no query overrides are read and nothing is
    /// reported until an analytics sink is set.
    pub fn from_experiments(experiments: Experiments) -> Self {
        ClientConfig {
            experiments,
            store: Box::new(InMemoryStore::new()),
            query: Box::new(NoQuery),
            analytics: None,
            random: Box::new(ThreadRandom),
            event_name: ClientConfig::DEFAULT_EVENT_NAME.to_owned(),
        }
    }

    /// Default name of reported analytics events.
    pub const DEFAULT_EVENT_NAME: &'static str = "AB Test";

    /// Set the store used to persist assignments, e.g. a cookie jar.
    pub fn store(mut self, store: impl KeyValueStore + Send + Sync + 'a) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Set the source of query-string overrides.
    pub fn query_source(mut self, query: impl QuerySource + Send + Sync + 'a) -> Self {
        self.query = Box::new(query);
        self
    }

    /// Set the sink receiving assignment reports.
    ///
    /// ```
    /// # use ab_segment::{ClientConfig, Experiments, TrackEvent};
    /// let config = ClientConfig::from_experiments(Experiments::default()).analytics(|event: TrackEvent| {
    ///   println!("{:?}", event);
    /// });
    /// ```
    pub fn analytics(mut self, analytics: impl AnalyticsSink + Send + Sync + 'a) -> Self {
        self.analytics = Some(Box::new(analytics));
        self
    }

    /// Override the random source used for bucketing.
    pub fn random_source(mut self, random: impl RandomSource + Send + Sync + 'a) -> Self {
        self.random = Box::new(random);
        self
    }

    /// Override the analytics event name.
    pub fn event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = event_name.into();
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    pub fn to_client(self) -> Client<'a> {
        Client::new(self)
    }
}
