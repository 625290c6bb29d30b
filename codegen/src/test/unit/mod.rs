pub mod elemwise;
