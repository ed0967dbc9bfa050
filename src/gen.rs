// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Gen<T>`]: a successful build, bundling the script, its reply list,
//! call log, and the produced value (`spec.md` §3, §6).

use crate::call::CallLog;
use crate::dispatch::{Filtered, PickFunction};
use crate::pick::Reply;
use crate::responder::Playback;
use crate::script::Script;

/// The record of one successful [`crate::generate`] call.
#[derive(Clone)]
pub struct Gen<T> {
    script: Script<T>,
    reply_list: Vec<Reply>,
    call_log: CallLog,
    value: T,
}

impl<T: 'static> Gen<T> {
    /// Bundles a completed dispatch into a `Gen`.
    #[must_use]
    pub fn new(script: Script<T>, reply_list: Vec<Reply>, call_log: CallLog, value: T) -> Self {
        Self {
            script,
            reply_list,
            call_log,
            value,
        }
    }

    /// The script this value was built from.
    #[must_use]
    pub fn script(&self) -> &Script<T> {
        &self.script
    }

    /// The flat reply stream that produced [`Self::value`].
    #[must_use]
    pub fn reply_list(&self) -> &[Reply] {
        &self.reply_list
    }

    /// The structured call log recorded while building the value.
    #[must_use]
    pub fn call_log(&self) -> &CallLog {
        &self.call_log
    }

    /// The produced value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwraps into the produced value, discarding provenance.
    #[must_use]
    pub fn must_build(self) -> T {
        self.value
    }

    /// Rebuilds from [`Self::reply_list`], producing a fresh `Gen`.
    ///
    /// # Errors
    ///
    /// Returns [`Filtered`] if the script no longer accepts its own
    /// recorded picks (it shouldn't, for a deterministic script).
    pub fn regenerate(&self) -> Result<Self, Filtered>
    where
        T: Clone,
    {
        let mut responder = Playback::new(self.reply_list.clone());
        let mut pick = PickFunction::new(&mut responder);
        let value = pick.dispatch(&self.script)?;
        let log = pick.into_log().into_log();
        let reply_list = log.replies();
        Ok(Self::new(self.script.clone(), reply_list, log, value))
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Gen<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gen")
            .field("script", &self.script.name())
            .field("reply_list", &self.reply_list)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
