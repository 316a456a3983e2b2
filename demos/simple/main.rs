use std::sync::Arc;

use ab_segment::{
    ClientConfig, ExperimentOptions, Experiments, InMemoryStore, KeyValueStore, TrackEvent,
};

pub fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/data/experiments.json".to_owned());
    let experiments = Experiments::from_path(&path).unwrap();

    // Share the store so persisted keys can be printed afterwards.
    let store = Arc::new(InMemoryStore::new());
    let client = ClientConfig::from_experiments(experiments)
        .store(store.clone())
        .analytics(|event: TrackEvent| {
            println!("track: {}", serde_json::to_string(&event).unwrap());
        })
        .to_client();

    for name in client.experiments().leaf_names() {
        let variant = client.experiment_variant(name, &ExperimentOptions::default());
        println!("{name}: {variant}");
    }

    for key in store.keys() {
        println!("{key} = {:?}", store.get(&key));
    }
}
