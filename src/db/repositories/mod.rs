//! Entity operations on the store, grouped per aggregate. All of them take
//! the transaction they run in; composites stay atomic because the caller
//! owns the commit.

mod categories;
mod domains;
mod keywords;
mod rankings;
