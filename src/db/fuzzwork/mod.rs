pub mod lib_fuzzwork;
pub mod sde_archive;
