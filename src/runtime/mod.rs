//! Native runtime support library called from generated code.
//!
//! Functions keep C signatures and are mapped into the JIT by symbol name.

mod output;
mod vector;

pub use output::{
    capture, format_g, opal_int_to_string, opal_printf, opal_puts, render_format, render_int,
};
pub use vector::{
    opal_vector_append, opal_vector_get, opal_vector_init, opal_vector_size, Vector,
    INITIAL_CAPACITY,
};

/// Module symbol → address of its implementation.
///
/// `malloc` and `free` are absent; the JIT resolves them from the host C library.
pub fn symbol_table() -> [(&'static str, usize); 7] {
    [
        ("puts", opal_puts as usize),
        ("printf", opal_printf as usize),
        ("int_to_string", opal_int_to_string as usize),
        ("vector_init", opal_vector_init as usize),
        ("vector_append", opal_vector_append as usize),
        ("vector_get", opal_vector_get as usize),
        ("vector_size", opal_vector_size as usize),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::codegen::runtime_symbols;

    #[test]
    fn every_mapped_symbol_is_declared() {
        let declared: Vec<&str> = runtime_symbols().collect();
        for (symbol, address) in symbol_table() {
            assert!(declared.contains(&symbol), "{symbol} is not declared");
            assert_ne!(address, 0);
        }
    }
}
