mod helpers;

mod tests_merge;

// Cascade and whole-table behavior
mod tests_cascade;
