use std::fmt::Debug;

use log::trace;

/// `set!` macro works like `vec!`, but generates a HashSet.
#[macro_export]
macro_rules! set {
    ( $( $x:expr ),* ) => {
        {
            let mut temp_set = std::collections::HashSet::new();
            $(temp_set.insert($x);)*
            temp_set
        }
    };
}

/// Log if `Result` is an error
pub trait Logged {
    fn log(self) -> Self;
}

impl<T, E> Logged for Result<T, E>
where
    E: Debug,
{
    fn log(self) -> Self {
        if let Err(e) = &self {
            trace!("---TraceError--- {:#?}", e)
        }
        self
    }
}

static LOGGER: std::sync::Once = std::sync::Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        dotenv::dotenv().ok();
        let modules = [
            "common_utils",
            "access_provider",
            "access_controller",
            "access_cli",
        ];
        let module_logs = modules
            .into_iter()
            .map(|m| format!("{}=debug", m))
            .collect::<Vec<_>>()
            .join(",");
        let rust_log = format!("info,{}", module_logs);
        if std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var("RUST_LOG", &rust_log);
        }
        tracing_subscriber::fmt::init();
    });
}
