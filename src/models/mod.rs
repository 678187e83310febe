pub mod movie;
pub mod user;

pub use movie::{
    external_id_of, CatalogMovie, EnrichedMovie, MovieDetails, MovieId, MovieRecord, MovieStatus,
    RankWindow, EXTERNAL_ID_FIELDS,
};
pub use user::{
    AddHistoryRequest, HistoryAppend, LoginRequest, SignUpRequest, TokenForm,
    TokenResponse, UserRecord, UserResponse,
};
