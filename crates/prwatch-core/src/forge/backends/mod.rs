mod github;

pub use github::GhCliSource;
