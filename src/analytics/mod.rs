pub mod rankings;

pub use rankings::{plant_rankings, PlantCatalog, PlantRanking, SortKey};
