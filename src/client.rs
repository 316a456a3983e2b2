use serde::{Deserialize, Serialize};

use crate::{
    assignment_store::{storage_key, AssignmentStore},
    reported::ReportDeduplicator,
    selector::draw_with_retries,
    ClientConfig, Experiments, TrackEvent,
};

/// Assigns visitors to experiment variants and reports assignments.
///
/// A `Client` bundles the experiment definitions with the collaborators it needs: the
/// [`KeyValueStore`](crate::KeyValueStore) holding persisted assignments, the
/// [`QuerySource`](crate::QuerySource) for manual overrides and an optional
/// [`AnalyticsSink`](crate::AnalyticsSink).
///
/// # Examples
/// ```
/// # use ab_segment::{Client, ClientConfig, ExperimentOptions, Experiments};
/// let experiments = Experiments::from_json_str(r#"[{ "name": "hero", "variants": [1, 1] }]"#)
///     .unwrap();
/// let client = Client::new(ClientConfig::from_experiments(experiments));
///
/// let variant = client.experiment_variant("hero", &ExperimentOptions::default());
/// assert!(variant < 2);
/// // Persisted assignment is reused.
/// assert_eq!(client.experiment_variant("hero", &ExperimentOptions::default()), variant);
/// ```
pub struct Client<'a> {
    config: ClientConfig<'a>,
}

/// Options for a single [`Client::experiment_variant`] call.
///
/// Deserializes from the camelCase form (`assignVariant`, `reportVariant`, `forceVariant`,
/// `segment`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentOptions {
    /// Draw and persist a variant if none is persisted yet. Defaults to `true`.
    pub assign_variant: bool,
    /// Report the assignment to analytics. `None` reports.
    pub report_variant: Option<bool>,
    /// Pin the experiment to this variant. A query-string override takes precedence.
    pub force_variant: Option<u32>,
    /// Extra payload merged into the reported event.
    pub segment: Segment,
}

/// Caller-supplied analytics payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    /// Extra event properties. Only a JSON object is merged.
    pub properties: Option<serde_json::Value>,
    /// Sink options, passed through untouched.
    pub options: Option<serde_json::Value>,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        ExperimentOptions {
            assign_variant: true,
            report_variant: None,
            force_variant: None,
            segment: Segment::default(),
        }
    }
}

impl ExperimentOptions {
    /// Same as [`ExperimentOptions::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether a missing assignment may be drawn and persisted.
    pub fn assign_variant(mut self, assign_variant: bool) -> Self {
        self.assign_variant = assign_variant;
        self
    }

    /// Set whether the assignment is reported to analytics.
    pub fn report_variant(mut self, report_variant: bool) -> Self {
        self.report_variant = Some(report_variant);
        self
    }

    /// Pin the experiment to `variant` and persist it.
    pub fn force_variant(mut self, variant: u32) -> Self {
        self.force_variant = Some(variant);
        self
    }

    /// Set extra properties for the reported event.
    pub fn segment_properties(mut self, properties: serde_json::Value) -> Self {
        self.segment.properties = Some(properties);
        self
    }

    /// Set sink options for the reported event.
    pub fn segment_options(mut self, options: serde_json::Value) -> Self {
        self.segment.options = Some(options);
        self
    }
}

impl<'a> Client<'a> {
    /// Create a new `Client` using the specified configuration.
    pub fn new(config: ClientConfig<'a>) -> Self {
        Client { config }
    }

    /// Experiment definitions this client assigns from.
    pub fn experiments(&self) -> &Experiments {
        &self.config.experiments
    }

    /// Returns `true` if assignment is globally disabled through `abs_disabled`.
    pub fn is_disabled(&self) -> bool {
        self.assignments().is_disabled()
    }

    /// Turn the global disable switch on or off. While disabled, every experiment resolves to
    /// `0` and nothing is persisted or reported.
    pub fn set_disabled(&self, disabled: bool) {
        self.assignments().set_disabled(disabled)
    }

    /// Get the variant of experiment `name` for the current visitor.
    ///
    /// A persisted assignment is reused; otherwise a variant is drawn by weight and persisted
    /// for the experiment's `maxAgeDays`. A nested experiment first resolves its parents and
    /// returns `0` unless every parent resolves to the branch containing it.
    ///
    /// `0` also stands for "no assignment": unknown experiments, a disabled client, a failed draw
    /// or `assign_variant: false` with nothing persisted all return `0`.
    ///
    /// Each `(experiment, variant)` pair is reported at most once per lifetime of the reported
    /// set.
    pub fn experiment_variant(&self, name: &str, options: &ExperimentOptions) -> u32 {
        let assignments = self.assignments();
        if assignments.is_disabled() {
            log::debug!(target: "ab_segment", experiment = name; "assignment is disabled");
            return 0;
        }

        let Some(found) = self.config.experiments.find_experiment(name) else {
            log::warn!(target: "ab_segment", experiment = name; "unknown experiment");
            return 0;
        };
        let resolved = found.resolve();

        let override_variant = self.override_variant(name, options);
        if let Some(variant) = override_variant {
            assignments.write(name, &variant.to_string(), resolved.max_age_days);
        }

        let mut active_variant = override_variant;
        let mut report = options.report_variant.unwrap_or(true);

        if let Some(parent) = found.parent {
            let parent_options = ExperimentOptions {
                assign_variant: options.assign_variant,
                report_variant: Some(false),
                force_variant: override_variant.map(|_| resolved.index as u32),
                segment: Segment::default(),
            };
            let parent_variant = self.experiment_variant(&parent.name, &parent_options);

            if parent_variant as usize != resolved.index {
                log::debug!(target: "ab_segment",
                            experiment = name,
                            parent:display = parent.name,
                            parent_variant;
                            "experiment branch is inactive");
                active_variant = Some(0);
                report = false;
            }
        }

        let variant = match active_variant {
            Some(variant) => variant,
            None => match assignments
                .read(name)
                .and_then(|value| parse_variant(name, &value))
            {
                Some(variant) => {
                    log::trace!(target: "ab_segment", experiment = name, variant; "reusing persisted variant");
                    variant
                }
                None => {
                    if !options.assign_variant {
                        return 0;
                    }

                    let Some(drawn) = draw_with_retries(&resolved.weights, &self.config.random)
                    else {
                        log::warn!(target: "ab_segment", experiment = name; "unable to draw a variant");
                        return 0;
                    };
                    let variant = drawn as u32;

                    log::debug!(target: "ab_segment", experiment = name, variant; "assigned new variant");
                    assignments.write(name, &variant.to_string(), resolved.max_age_days);
                    variant
                }
            },
        };

        if report {
            self.report(name, variant, &options.segment);
        }

        variant
    }

    fn assignments(&self) -> AssignmentStore<'_> {
        AssignmentStore::new(&*self.config.store)
    }

    /// A query-string override wins over `force_variant`.
    fn override_variant(&self, name: &str, options: &ExperimentOptions) -> Option<u32> {
        self.config
            .query
            .get(&storage_key(name))
            .and_then(|value| parse_variant(name, &value))
            .or(options.force_variant)
    }

    fn report(&self, name: &str, variant: u32, segment: &Segment) {
        let Some(analytics) = &self.config.analytics else {
            return;
        };

        let reported = ReportDeduplicator::new(&*self.config.store);
        let variant = variant.to_string();
        let key = ReportDeduplicator::report_key(name, &variant);
        if !reported.should_report(&key) {
            return;
        }

        let mut properties = match &segment.properties {
            Some(serde_json::Value::Object(properties)) => properties.clone(),
            Some(other) => {
                log::warn!(target: "ab_segment",
                           experiment = name,
                           properties:serde = other;
                           "ignoring segment properties that are not an object");
                serde_json::Map::new()
            }
            None => serde_json::Map::new(),
        };
        properties.insert("experiment".to_owned(), name.into());
        properties.insert("variant".to_owned(), variant.into());

        let event = TrackEvent {
            event: self.config.event_name.clone(),
            properties,
            options: segment.options.clone(),
        };
        log::trace!(target: "ab_segment", event:serde; "reporting assignment");
        analytics.track(event);

        reported.mark_reported(&key);
    }
}

fn parse_variant(name: &str, value: &str) -> Option<u32> {
    value
        .parse::<u32>()
        .inspect_err(|err| {
            log::warn!(target: "ab_segment",
                       experiment = name,
                       value;
                       "ignoring invalid variant value: {:?}", err);
        })
        .ok()
}
