//! Builtin globals per ECMAScript version and named environments.

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalAccess {
    Readonly,
    Writable,
    Off,
}

/// A global's access as written in config: a boolean or one of the named forms.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GlobalValue {
    Bool(bool),
    Name(String),
}

impl GlobalValue {
    pub fn resolve(&self, name: &str) -> Result<GlobalAccess, ConfigError> {
        match self {
            GlobalValue::Bool(true) => Ok(GlobalAccess::Writable),
            GlobalValue::Bool(false) => Ok(GlobalAccess::Readonly),
            GlobalValue::Name(value) => match value.as_str() {
                "writable" | "writeable" | "true" => Ok(GlobalAccess::Writable),
                "readonly" | "readable" | "false" => Ok(GlobalAccess::Readonly),
                "off" => Ok(GlobalAccess::Off),
                _ => Err(ConfigError::InvalidGlobal {
                    name: name.to_string(),
                    value: value.clone(),
                }),
            },
        }
    }
}

const ES5: &[&str] = &[
    "Array",
    "Boolean",
    "constructor",
    "Date",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "Error",
    "escape",
    "eval",
    "EvalError",
    "Function",
    "hasOwnProperty",
    "Infinity",
    "isFinite",
    "isNaN",
    "isPrototypeOf",
    "JSON",
    "Math",
    "NaN",
    "Number",
    "Object",
    "parseFloat",
    "parseInt",
    "propertyIsEnumerable",
    "RangeError",
    "ReferenceError",
    "RegExp",
    "String",
    "SyntaxError",
    "toLocaleString",
    "toString",
    "TypeError",
    "undefined",
    "unescape",
    "URIError",
    "valueOf",
];

const ES2015: &[&str] = &[
    "ArrayBuffer",
    "DataView",
    "Float32Array",
    "Float64Array",
    "Int16Array",
    "Int32Array",
    "Int8Array",
    "Map",
    "Promise",
    "Proxy",
    "Reflect",
    "Set",
    "Symbol",
    "Uint16Array",
    "Uint32Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "WeakMap",
    "WeakSet",
];

const ES2017: &[&str] = &["Atomics", "SharedArrayBuffer"];

const ES2020: &[&str] = &["BigInt", "BigInt64Array", "BigUint64Array", "globalThis"];

const ES2021: &[&str] = &["AggregateError", "FinalizationRegistry", "WeakRef"];

const BROWSER: &[&str] = &[
    "alert",
    "atob",
    "btoa",
    "cancelAnimationFrame",
    "clearInterval",
    "clearTimeout",
    "console",
    "document",
    "Event",
    "fetch",
    "FormData",
    "HTMLElement",
    "localStorage",
    "location",
    "navigator",
    "requestAnimationFrame",
    "self",
    "sessionStorage",
    "setInterval",
    "setTimeout",
    "URL",
    "URLSearchParams",
    "window",
    "XMLHttpRequest",
];

const NODE: &[&str] = &[
    "__dirname",
    "__filename",
    "Buffer",
    "clearImmediate",
    "clearInterval",
    "clearTimeout",
    "console",
    "exports",
    "global",
    "module",
    "process",
    "queueMicrotask",
    "require",
    "setImmediate",
    "setInterval",
    "setTimeout",
    "URL",
    "URLSearchParams",
];

const COMMONJS: &[&str] = &["exports", "global", "module", "require"];

/// Names of the builtin globals available at `ecma_version`.
pub fn builtin_globals(ecma_version: u32) -> impl Iterator<Item = &'static str> {
    let tiers: [(u32, &'static [&'static str]); 5] = [
        (0, ES5),
        (2015, ES2015),
        (2017, ES2017),
        (2020, ES2020),
        (2021, ES2021),
    ];
    tiers
        .into_iter()
        .filter(move |(since, _)| ecma_version >= *since)
        .flat_map(|(_, names)| names.iter().copied())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub globals: &'static [&'static str],
    /// Builtins of this version come with the environment.
    pub builtins: Option<u32>,
    /// Parser `ecmaVersion` implied when none is configured.
    pub ecma_version: Option<u32>,
}

pub fn environment(name: &str) -> Option<Environment> {
    let env = match name {
        "browser" => Environment {
            globals: BROWSER,
            builtins: None,
            ecma_version: None,
        },
        "node" => Environment {
            globals: NODE,
            builtins: None,
            ecma_version: None,
        },
        "commonjs" => Environment {
            globals: COMMONJS,
            builtins: None,
            ecma_version: None,
        },
        "builtin" | "es5" => Environment {
            globals: &[],
            builtins: Some(5),
            ecma_version: None,
        },
        "es6" | "es2015" => es_env(2015),
        "es2016" => es_env(2016),
        "es2017" => es_env(2017),
        "es2018" => es_env(2018),
        "es2019" => es_env(2019),
        "es2020" => es_env(2020),
        "es2021" => es_env(2021),
        "es2022" => es_env(2022),
        _ => return None,
    };
    Some(env)
}

fn es_env(version: u32) -> Environment {
    Environment {
        globals: &[],
        builtins: Some(version),
        ecma_version: Some(version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_grow_with_version() {
        let es5: Vec<_> = builtin_globals(5).collect();
        let es2020: Vec<_> = builtin_globals(2020).collect();

        assert!(es5.contains(&"RegExp"));
        assert!(!es5.contains(&"Map"));
        assert!(!es5.contains(&"globalThis"));
        assert!(es2020.contains(&"Map"));
        assert!(es2020.contains(&"globalThis"));
    }

    #[test]
    fn global_values_resolve() {
        assert_eq!(
            GlobalValue::Bool(true).resolve("a").unwrap(),
            GlobalAccess::Writable
        );
        assert_eq!(
            GlobalValue::Bool(false).resolve("a").unwrap(),
            GlobalAccess::Readonly
        );
        assert_eq!(
            GlobalValue::Name("off".into()).resolve("a").unwrap(),
            GlobalAccess::Off
        );
        assert!(GlobalValue::Name("sometimes".into()).resolve("a").is_err());
    }

    #[test]
    fn es2020_environment_implies_builtins() {
        let env = environment("es2020").unwrap();

        assert_eq!(env.builtins, Some(2020));
        assert!(environment("martian").is_none());
    }
}
