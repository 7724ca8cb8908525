pub mod codegen_basics;
pub mod codegen_calls;
pub mod codegen_declarations;

pub mod driver_suite;

pub mod pp_comments;

pub mod parser_decl;
pub mod parser_stmt;

pub mod semantic_const_eval;
pub mod semantic_layout;
pub mod semantic_scope;

pub mod test_utils;
