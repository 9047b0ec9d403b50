//! What the Bandwidth layer provisions and how it answers callbacks

use bw_core::{Config, LocalNumberQuery};
use bw_extra::ProvisionStrategy;

use crate::callback::CallbackHandler;

/// Phone number allocated to the application
///
/// A local number matching `local_query` is ordered when it is set, a
/// toll-free number otherwise.
#[derive(Debug, Clone, Default)]
pub struct PhoneNumberOptions {
    pub name: Option<String>,
    pub local_query: Option<LocalNumberQuery>,
}

impl PhoneNumberOptions {
    pub fn toll_free() -> Self {
        Self::default()
    }

    pub fn local(query: LocalNumberQuery) -> Self {
        Self {
            name: None,
            local_query: Some(query),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct BandwidthOptions {
    /// Application name before host qualification
    pub application_name: String,
    pub phone_number: Option<PhoneNumberOptions>,
    pub domain_name: Option<String>,
    /// Scheme of the callback URLs given to a new application
    pub use_https_callbacks: bool,
    pub strategy: ProvisionStrategy,
    pub call_callback: Option<CallbackHandler>,
    pub message_callback: Option<CallbackHandler>,
}

impl BandwidthOptions {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            phone_number: None,
            domain_name: None,
            use_https_callbacks: true,
            strategy: ProvisionStrategy::default(),
            call_callback: None,
            message_callback: None,
        }
    }

    /// Options from the `[application]`, `[phone_number]` and `[domain]` sections
    pub fn from_config(config: &Config) -> Self {
        let phone_number = config.phone_number.as_ref().map(|phone| PhoneNumberOptions {
            name: phone.name.clone(),
            local_query: phone.area_code.as_deref().map(LocalNumberQuery::area_code),
        });

        Self {
            phone_number,
            domain_name: config.domain_name.clone(),
            use_https_callbacks: config.application.use_https_callbacks,
            ..Self::new(config.application.name.clone())
        }
    }

    pub fn with_phone_number(mut self, phone_number: PhoneNumberOptions) -> Self {
        self.phone_number = Some(phone_number);
        self
    }

    pub fn with_domain(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    pub fn with_https_callbacks(mut self, use_https: bool) -> Self {
        self.use_https_callbacks = use_https;
        self
    }

    pub fn with_strategy(mut self, strategy: ProvisionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Handler for `/bandwidth/callback/call`
    pub fn on_call(mut self, handler: CallbackHandler) -> Self {
        self.call_callback = Some(handler);
        self
    }

    /// Handler for `/bandwidth/callback/message`
    pub fn on_message(mut self, handler: CallbackHandler) -> Self {
        self.message_callback = Some(handler);
        self
    }
}
