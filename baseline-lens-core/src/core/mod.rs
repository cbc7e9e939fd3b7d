mod entry;
mod status;

// 导出常用项
pub use entry::{TaxonomyEntry, TaxonomyLibrary, TaxonomySource};
pub use status::{
    Availability, BaselineStatus, BrowserVersion, SupportNotes, SupportStatement, SupportTable,
    VersionValue,
};
