/*
 * Error Module
 *
 * Errors raised while setting up a simulation: unknown species names,
 * species used in the wrong role, and invalid tunables. Nothing in here is
 * expected to surface once the first tick has run.
 */

use thiserror::Error;

use crate::boid::BoidType;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoidError {
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),

    #[error("{0} is not a movable species")]
    NotMovable(BoidType),

    #[error("{0} is not a rooted species")]
    NotRooted(BoidType),

    #[error("no parameters registered for {0}")]
    MissingSpecies(BoidType),

    #[error("invalid value {value} for `{field}` of {species}")]
    InvalidParameter {
        species: BoidType,
        field: &'static str,
        value: f32,
    },

    #[error("{species} cannot be its own {role}")]
    SelfRelation {
        species: BoidType,
        role: &'static str,
    },

    #[error("invalid simulation setting `{field}`: {value}")]
    InvalidSimulation { field: &'static str, value: f32 },
}

pub type Result<T> = std::result::Result<T, BoidError>;
