pub mod participants;
pub mod playlist;
