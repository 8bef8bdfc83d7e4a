//! Client-side state stores for a storefront
//!
//! [`SessionStore`] tracks who is signed in, [`CartStore`] tracks what is in
//! their cart. The two are independent; each is built from the remote
//! collaborator it needs and handed to whoever renders it.

mod types;
pub mod remote;
pub mod session;
pub mod cart;
pub mod supabase;
pub mod memory;

pub use types::*;
pub use remote::{CartRepository, IdentityService};
pub use session::SessionStore;
pub use cart::CartStore;
pub use supabase::SupabaseCartRepository;
pub use memory::{MemoryCartRepository, MemoryIdentityService};
