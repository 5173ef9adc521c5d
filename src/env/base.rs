use std::collections::HashMap;

use crate::common::{logger::LogData, spaces::Space};

#[derive(Debug, Clone, PartialEq)]
pub enum InfoData<O> {
    String(String),
    Float(f32),
    Int(i32),
    Bool(bool),
    Obs(O),
    InfoDict(Info<O>),
}

pub type ResetOptions = HashMap<String, LogData>;
pub type Info<O> = HashMap<String, InfoData<O>>;

#[derive(Clone, Debug)]
pub struct EnvObservation<O> {
    pub obs: O,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info<O>,
}

#[derive(Clone, Debug, Copy, PartialEq)]
pub struct RewardRange {
    pub low: f32,
    pub high: f32,
}

pub trait Env<O, A> {
    fn step(&mut self, action: &A) -> EnvObservation<O>;
    fn reset(&mut self, seed: Option<u64>, options: Option<ResetOptions>) -> O;
    fn action_space(&self) -> Box<dyn Space<A>>;
    fn observation_space(&self) -> Box<dyn Space<O>>;
    fn reward_range(&self) -> RewardRange;
    fn close(&mut self);
    fn unwrapped(&self) -> &dyn Env<O, A>;
}
