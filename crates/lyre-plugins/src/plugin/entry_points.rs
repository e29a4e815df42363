//! Resolved entry points of a current-ABI plugin.

use std::fmt;

use lyre_plugin_abi::current::{
    DeactivateFeaturesFn, FetchPositionalDataFn, GetApiVersionFn, GetAuthorFn,
    GetDescriptionFn, GetNameFn, GetPluginFeaturesFn, GetVersionFn, InitFn,
    InitPositionalDataFn, OnAudioInputFn, OnAudioOutputAboutToPlayFn, OnAudioSourceFetchedFn,
    OnAudioSourceProcessedFn, OnChannelEnteredFn, OnChannelExitedFn, OnReceiveDataFn,
    OnServerConnectedFn, OnServerDisconnectedFn, OnUserTalkingStateChangedFn,
    RegisterApiFunctionsFn, RegisterPluginIdFn, SetHostInfoFn, ShutdownFn,
    ShutdownPositionalDataFn, symbols,
};

use crate::resolver::{SymbolResolver, resolve_fn};

/// Looks a symbol up with the type of the field it is assigned to.
macro_rules! lookup {
    ($resolver:expr, $symbol:expr) => {
        // SAFETY: every field of `EntryPoints` is typed with the signature
        // the ABI crate declares for the symbol resolved into it.
        unsafe { resolve_fn($resolver, $symbol) }
    };
}

/// One optional function pointer per exported entry point.
#[derive(Clone, Copy, Default)]
pub(crate) struct EntryPoints {
    pub(crate) init: Option<InitFn>,
    pub(crate) shutdown: Option<ShutdownFn>,
    pub(crate) get_name: Option<GetNameFn>,
    pub(crate) get_api_version: Option<GetApiVersionFn>,
    pub(crate) register_api_functions: Option<RegisterApiFunctionsFn>,
    pub(crate) set_host_info: Option<SetHostInfoFn>,
    pub(crate) get_version: Option<GetVersionFn>,
    pub(crate) get_author: Option<GetAuthorFn>,
    pub(crate) get_description: Option<GetDescriptionFn>,
    pub(crate) register_plugin_id: Option<RegisterPluginIdFn>,
    pub(crate) get_plugin_features: Option<GetPluginFeaturesFn>,
    pub(crate) deactivate_features: Option<DeactivateFeaturesFn>,
    pub(crate) init_positional_data: Option<InitPositionalDataFn>,
    pub(crate) fetch_positional_data: Option<FetchPositionalDataFn>,
    pub(crate) shutdown_positional_data: Option<ShutdownPositionalDataFn>,
    pub(crate) on_server_connected: Option<OnServerConnectedFn>,
    pub(crate) on_server_disconnected: Option<OnServerDisconnectedFn>,
    pub(crate) on_channel_entered: Option<OnChannelEnteredFn>,
    pub(crate) on_channel_exited: Option<OnChannelExitedFn>,
    pub(crate) on_user_talking_state_changed: Option<OnUserTalkingStateChangedFn>,
    pub(crate) on_receive_data: Option<OnReceiveDataFn>,
    pub(crate) on_audio_input: Option<OnAudioInputFn>,
    pub(crate) on_audio_source_fetched: Option<OnAudioSourceFetchedFn>,
    pub(crate) on_audio_source_processed: Option<OnAudioSourceProcessedFn>,
    pub(crate) on_audio_output_about_to_play: Option<OnAudioOutputAboutToPlayFn>,
}

impl EntryPoints {
    /// Resolves the five mandatory entry points.
    ///
    /// Returns the name of the first missing symbol. Nothing optional is
    /// looked up here.
    pub(crate) fn resolve_mandatory(resolver: &dyn SymbolResolver) -> Result<Self, &'static str> {
        let entries = Self {
            init: Some(lookup!(resolver, symbols::INIT).ok_or(symbols::INIT)?),
            shutdown: Some(lookup!(resolver, symbols::SHUTDOWN).ok_or(symbols::SHUTDOWN)?),
            get_name: Some(lookup!(resolver, symbols::GET_NAME).ok_or(symbols::GET_NAME)?),
            get_api_version: Some(
                lookup!(resolver, symbols::GET_API_VERSION).ok_or(symbols::GET_API_VERSION)?,
            ),
            register_api_functions: Some(
                lookup!(resolver, symbols::REGISTER_API_FUNCTIONS)
                    .ok_or(symbols::REGISTER_API_FUNCTIONS)?,
            ),
            ..Self::default()
        };
        Ok(entries)
    }

    /// Resolves every optional entry point. Missing ones stay `None`.
    pub(crate) fn resolve_optional(&mut self, resolver: &dyn SymbolResolver) {
        self.set_host_info = lookup!(resolver, symbols::SET_MUMBLE_INFO);
        self.get_version = lookup!(resolver, symbols::GET_VERSION);
        self.get_author = lookup!(resolver, symbols::GET_AUTHOR);
        self.get_description = lookup!(resolver, symbols::GET_DESCRIPTION);
        self.register_plugin_id = lookup!(resolver, symbols::REGISTER_PLUGIN_ID);
        self.get_plugin_features = lookup!(resolver, symbols::GET_PLUGIN_FEATURES);
        self.deactivate_features = lookup!(resolver, symbols::DEACTIVATE_FEATURES);
        self.init_positional_data = lookup!(resolver, symbols::INIT_POSITIONAL_DATA);
        self.fetch_positional_data = lookup!(resolver, symbols::FETCH_POSITIONAL_DATA);
        self.shutdown_positional_data = lookup!(resolver, symbols::SHUTDOWN_POSITIONAL_DATA);
        self.on_server_connected = lookup!(resolver, symbols::ON_SERVER_CONNECTED);
        self.on_server_disconnected = lookup!(resolver, symbols::ON_SERVER_DISCONNECTED);
        self.on_channel_entered = lookup!(resolver, symbols::ON_CHANNEL_ENTERED);
        self.on_channel_exited = lookup!(resolver, symbols::ON_CHANNEL_EXITED);
        self.on_user_talking_state_changed =
            lookup!(resolver, symbols::ON_USER_TALKING_STATE_CHANGED);
        self.on_receive_data = lookup!(resolver, symbols::ON_RECEIVE_DATA);
        self.on_audio_input = lookup!(resolver, symbols::ON_AUDIO_INPUT);
        self.on_audio_source_fetched = lookup!(resolver, symbols::ON_AUDIO_SOURCE_FETCHED);
        self.on_audio_source_processed = lookup!(resolver, symbols::ON_AUDIO_SOURCE_PROCESSED);
        self.on_audio_output_about_to_play =
            lookup!(resolver, symbols::ON_AUDIO_OUTPUT_ABOUT_TO_PLAY);
    }

    /// Clears the positional group unless all three entry points are present.
    /// Returns `true` when a partial group was cleared.
    pub(crate) const fn enforce_positional_group(&mut self) -> bool {
        let init = self.init_positional_data.is_some();
        let fetch = self.fetch_positional_data.is_some();
        let shutdown = self.shutdown_positional_data.is_some();
        let partial = !(init && fetch && shutdown) && (init || fetch || shutdown);
        if partial {
            self.init_positional_data = None;
            self.fetch_positional_data = None;
            self.shutdown_positional_data = None;
        }
        partial
    }

    pub(crate) const fn has_positional_data(&self) -> bool {
        self.init_positional_data.is_some()
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("init", &self.init.is_some())
            .field("get_name", &self.get_name.is_some())
            .field("positional", &self.has_positional_data())
            .finish_non_exhaustive()
    }
}
