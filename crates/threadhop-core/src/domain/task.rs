//! Task abstractions - どの実行コンテキストで何を実行するか
//!
//! # 3 種類のタスク
//! - **UiTask**: UI コンテキストで入力を受け取って実行
//! - **BackgroundTask**: background pool で入力から出力を計算
//! - **CombinedTask**: background で計算 → 出力を UI コンテキストで受け取る
//!
//! どのタスクも 1 回使い切りです（dispatcher が消費し、完了後に破棄）。
//! 入力値は `TaskEnvelope` がタスクと一緒に保持します。

use std::marker::PhantomData;

use super::errors::BoxError;
use super::ids::DispatchId;

/// A unit of work run on the UI execution context.
///
/// # 使用例
/// ```ignore
/// struct ShowMessage;
///
/// impl UiTask for ShowMessage {
///     type Input = String;
///
///     fn run_on_ui(self, input: String) -> Result<(), BoxError> {
///         println!("{input}");
///         Ok(())
///     }
/// }
/// ```
pub trait UiTask: Send + 'static {
    type Input: Send + 'static;

    fn run_on_ui(self, input: Self::Input) -> Result<(), BoxError>;
}

/// A unit of work run on the background pool.
///
/// `&mut self` なので、`CombinedTask` は計算後も自分自身を UI 側へ持ち越せます。
pub trait BackgroundTask: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn run_in_background(&mut self, input: Self::Input) -> Result<Self::Output, BoxError>;
}

/// Background computation followed by a UI-context step receiving its output.
pub trait CombinedTask: BackgroundTask {
    fn run_on_ui(self, output: Self::Output) -> Result<(), BoxError>;
}

/// TaskEnvelope はタスク + 入力値 + DispatchId の“運搬用”データ。
#[derive(Debug)]
pub struct TaskEnvelope<T, In> {
    dispatch_id: DispatchId,
    task: T,
    input: In,
}

impl<T, In> TaskEnvelope<T, In> {
    pub fn new(task: T, input: In) -> Self {
        Self::with_id(DispatchId::generate(), task, input)
    }

    pub fn with_id(dispatch_id: DispatchId, task: T, input: In) -> Self {
        Self {
            dispatch_id,
            task,
            input,
        }
    }

    pub fn dispatch_id(&self) -> DispatchId {
        self.dispatch_id
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn input(&self) -> &In {
        &self.input
    }

    pub fn into_parts(self) -> (DispatchId, T, In) {
        (self.dispatch_id, self.task, self.input)
    }
}

// ========================================
// クロージャから Task を作るアダプタ
// ========================================

/// UiTask built from a closure. See [`ui_task`].
pub struct FnUiTask<F, In> {
    f: F,
    _marker: PhantomData<fn(In)>,
}

/// Wraps a closure as a [`UiTask`].
pub fn ui_task<In, F>(f: F) -> FnUiTask<F, In>
where
    In: Send + 'static,
    F: FnOnce(In) -> Result<(), BoxError> + Send + 'static,
{
    FnUiTask {
        f,
        _marker: PhantomData,
    }
}

impl<In, F> UiTask for FnUiTask<F, In>
where
    In: Send + 'static,
    F: FnOnce(In) -> Result<(), BoxError> + Send + 'static,
{
    type Input = In;

    fn run_on_ui(self, input: In) -> Result<(), BoxError> {
        (self.f)(input)
    }
}

/// BackgroundTask built from a closure. See [`background_task`].
pub struct FnBackgroundTask<F, In, Out> {
    f: F,
    _marker: PhantomData<fn(In) -> Out>,
}

/// Wraps a closure as a [`BackgroundTask`].
pub fn background_task<In, Out, F>(f: F) -> FnBackgroundTask<F, In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
    F: FnMut(In) -> Result<Out, BoxError> + Send + 'static,
{
    FnBackgroundTask {
        f,
        _marker: PhantomData,
    }
}

impl<In, Out, F> BackgroundTask for FnBackgroundTask<F, In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
    F: FnMut(In) -> Result<Out, BoxError> + Send + 'static,
{
    type Input = In;
    type Output = Out;

    fn run_in_background(&mut self, input: In) -> Result<Out, BoxError> {
        (self.f)(input)
    }
}

/// CombinedTask built from two closures. See [`combined_task`].
pub struct FnCombinedTask<B, U, In, Out> {
    background: B,
    ui: U,
    _marker: PhantomData<fn(In) -> Out>,
}

/// Wraps a background closure and a UI closure as a [`CombinedTask`].
pub fn combined_task<In, Out, B, U>(background: B, ui: U) -> FnCombinedTask<B, U, In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
    B: FnMut(In) -> Result<Out, BoxError> + Send + 'static,
    U: FnOnce(Out) -> Result<(), BoxError> + Send + 'static,
{
    FnCombinedTask {
        background,
        ui,
        _marker: PhantomData,
    }
}

impl<In, Out, B, U> BackgroundTask for FnCombinedTask<B, U, In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
    B: FnMut(In) -> Result<Out, BoxError> + Send + 'static,
    U: FnOnce(Out) -> Result<(), BoxError> + Send + 'static,
{
    type Input = In;
    type Output = Out;

    fn run_in_background(&mut self, input: In) -> Result<Out, BoxError> {
        (self.background)(input)
    }
}

impl<In, Out, B, U> CombinedTask for FnCombinedTask<B, U, In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
    B: FnMut(In) -> Result<Out, BoxError> + Send + 'static,
    U: FnOnce(Out) -> Result<(), BoxError> + Send + 'static,
{
    fn run_on_ui(self, output: Out) -> Result<(), BoxError> {
        (self.ui)(output)
    }
}
