pub mod newlines;
