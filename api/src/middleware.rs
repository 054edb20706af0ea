use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use tokio::sync::mpsc::UnboundedSender;

/// Tells the Lambda flush extension that a request has been answered.
///
/// Without a channel (outside Lambda) requests pass straight through.
#[derive(Clone, Default)]
pub struct RequestDoneSignal {
    request_done_sender: Option<UnboundedSender<()>>,
}

impl RequestDoneSignal {
    pub fn new(request_done_sender: Option<UnboundedSender<()>>) -> Self {
        Self {
            request_done_sender,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestDoneSignal
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestDoneSignalMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestDoneSignalMiddleware {
            service,
            request_done_sender: self.request_done_sender.clone(),
        }))
    }
}

pub struct RequestDoneSignalMiddleware<S> {
    service: S,
    request_done_sender: Option<UnboundedSender<()>>,
}

impl<S, B> Service<ServiceRequest> for RequestDoneSignalMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_done_sender = self.request_done_sender.clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await;
            if let Some(sender) = request_done_sender {
                let _ = sender.send(());
            }
            res
        })
    }
}
