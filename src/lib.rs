pub mod buffer;
pub mod layout;

pub mod batch;
pub mod lines;
pub mod mesh;
pub mod query;

pub mod descriptor;
pub mod header;

pub mod read;
pub mod write;

pub const FORMAT_VERSION: u16 = 1;
pub const MAGIC: [u8; 4] = [b'P', b'k', b'M', b's'];

pub type HashMap<K, V> = rapidhash::RapidHashMap<K, V>;
pub type HashSet<T> = rapidhash::RapidHashSet<T>;
