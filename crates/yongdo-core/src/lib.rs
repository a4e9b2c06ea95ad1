pub mod endpoint;
pub mod feasibility;
pub mod parcel;
pub mod ratio;
pub mod zoning;

pub use endpoint::{EndpointCandidate, default_candidates};
pub use feasibility::{
    FeasibilityInput, FeasibilityReport, UnitBreakdown, UnitType, VolumePreview, calculate,
};
pub use parcel::{Address, ParcelId, ParcelIdError};
pub use ratio::{RatioPair, ratio_for};
pub use zoning::{NO_INFORMATION, ZoningLabel, ZoningMatch, ZoningScan, scan_zoning};
