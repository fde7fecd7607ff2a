mod in_memory_coordination_store;

pub use in_memory_coordination_store::InMemoryCoordinationStore;
