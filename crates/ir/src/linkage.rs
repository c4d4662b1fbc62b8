use std::{fmt, str::FromStr};

/// Linkage of symbols.
///
/// The full source-dialect set is kept so that diagnostics can name the
/// offending linkage; the stable subset itself admits only `External` and
/// `Internal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    /// The symbol is visible outside of the module.
    External,

    #[default]
    /// The symbol is local to the module.
    Internal,

    Private,
    LinkerPrivate,
    LinkerPrivateWeak,
    LinkOnce,
    LinkOnceOdr,
    Weak,
    WeakOdr,
    Common,
    Appending,
    DllImport,
    DllExport,
    ExternWeak,
    AvailableExternally,
}

impl Linkage {
    pub fn name(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::Private => "private",
            Self::LinkerPrivate => "linker_private",
            Self::LinkerPrivateWeak => "linker_private_weak",
            Self::LinkOnce => "linkonce",
            Self::LinkOnceOdr => "linkonce_odr",
            Self::Weak => "weak",
            Self::WeakOdr => "weak_odr",
            Self::Common => "common",
            Self::Appending => "appending",
            Self::DllImport => "dllimport",
            Self::DllExport => "dllexport",
            Self::ExternWeak => "extern_weak",
            Self::AvailableExternally => "available_externally",
        }
    }

    pub fn is_external(self) -> bool {
        matches!(self, Self::External)
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for Linkage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(Self::External),
            "internal" => Ok(Self::Internal),
            "private" => Ok(Self::Private),
            "linker_private" => Ok(Self::LinkerPrivate),
            "linker_private_weak" => Ok(Self::LinkerPrivateWeak),
            "linkonce" => Ok(Self::LinkOnce),
            "linkonce_odr" => Ok(Self::LinkOnceOdr),
            "weak" => Ok(Self::Weak),
            "weak_odr" => Ok(Self::WeakOdr),
            "common" => Ok(Self::Common),
            "appending" => Ok(Self::Appending),
            "dllimport" => Ok(Self::DllImport),
            "dllexport" => Ok(Self::DllExport),
            "extern_weak" => Ok(Self::ExternWeak),
            "available_externally" => Ok(Self::AvailableExternally),
            _ => Err(()),
        }
    }
}

/// Symbol visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
    Protected,
}

impl Visibility {
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Hidden => "hidden",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// Calling conventions, identified by their numeric dialect id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallConv {
    /// The platform-default C calling convention.
    #[default]
    C,
    Fast,
    Cold,
    Other(u32),
}

impl CallConv {
    pub fn id(self) -> u32 {
        match self {
            Self::C => 0,
            Self::Fast => 8,
            Self::Cold => 9,
            Self::Other(id) => id,
        }
    }
}

impl fmt::Display for CallConv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id().fmt(f)
    }
}
