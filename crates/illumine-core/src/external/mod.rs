//! External-collaborator traits (spec §6). Each trait is the contract the
//! core pipeline depends on; concrete implementations live outside this
//! crate (a production binary wires real providers, tests wire stubs/mocks),
//! the way `dashflow`'s `ChatModel` trait is implemented separately by each
//! provider crate.

pub mod image_model;
pub mod object_store;
pub mod parsing;
pub mod persistence;
pub mod text_model;

pub use image_model::{ImageJobStatus, ImageModel, ImagePollResult, ImageRequest};
pub use object_store::ObjectStore;
pub use parsing::{DetectedChapter, ParseResult, ParsingCollaborator};
pub use persistence::Repository;
pub use text_model::{
    ExtractedEntities, ExtractedEntity, ExtractedLocation, ExtractedScene, QualityAssessment,
    SceneContext, TextModel,
};
